//! Frame preprocessing: BGR frame → normalized NCHW tensor.

use anyhow::{bail, Result};
use fast_image_resize as fr;
use ndarray::Array4;

/// A borrowed video frame: interleaved BGR, 8 bits per channel.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
}

/// Converts frames into the `[1, 3, H, W]` f32 tensor the model expects.
///
/// The resize destination and the output tensor are scratch buffers
/// allocated once and reused across calls, so a `Preprocessor` must not
/// be shared between overlapping invocations.
#[derive(Debug)]
pub struct Preprocessor {
    resizer: fr::Resizer,
    resized: fr::images::Image<'static>,
    tensor: Array4<f32>,
    width: u32,
    height: u32,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resizer: fr::Resizer::new(),
            resized: fr::images::Image::new(width, height, fr::PixelType::U8x3),
            tensor: Array4::zeros((1, 3, height as usize, width as usize)),
            width,
            height,
        }
    }

    /// Resize to the model input size, reorder BGR→RGB and normalize each
    /// byte to `[0, 1]`, channel-planar.
    pub fn run(&mut self, frame: &Frame) -> Result<&Array4<f32>> {
        if frame.width == 0 || frame.height == 0 {
            bail!("empty frame ({}x{})", frame.width, frame.height);
        }
        let expected = frame.width as usize * frame.height as usize * 3;
        if frame.data.len() != expected {
            bail!(
                "expected {} BGR bytes for a {}x{} frame, received {}",
                expected,
                frame.width,
                frame.height,
                frame.data.len()
            );
        }

        let src = fr::images::ImageRef::new(frame.width, frame.height, frame.data, fr::PixelType::U8x3)?;
        self.resizer.resize(
            &src,
            &mut self.resized,
            &fr::ResizeOptions::new().resize_alg(fr::ResizeAlg::Nearest),
        )?;

        let width = self.width as usize;
        for (i, bgr) in self.resized.buffer().chunks_exact(3).enumerate() {
            let y = i / width;
            let x = i % width;
            self.tensor[[0, 0, y, x]] = bgr[2] as f32 / 255.0;
            self.tensor[[0, 1, y, x]] = bgr[1] as f32 / 255.0;
            self.tensor[[0, 2, y, x]] = bgr[0] as f32 / 255.0;
        }

        Ok(&self.tensor)
    }

    pub fn input_width(&self) -> u32 {
        self.width
    }

    pub fn input_height(&self) -> u32 {
        self.height
    }
}
