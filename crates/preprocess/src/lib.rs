//! Letterbox preprocessing: aspect-preserving resize, stride-aligned
//! constant padding, and per-channel normalization into an NCHW
//! tensor.

use common::span;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer, images::Image};
use ndarray::{Array, IxDyn};

/// Per-channel `(pixel - mean) * scale` normalization over raw 0..255
/// values, in the tensor's channel order.
#[derive(Debug, Clone)]
pub struct Normalization {
    pub mean: [f32; 3],
    pub scale: [f32; 3],
}

/// Padded tensor plus the geometry needed to undo the letterbox.
#[derive(Debug)]
pub struct PreprocessOutput {
    /// `[1, 3, padded_height, padded_width]` normalized pixels.
    pub tensor: Array<f32, IxDyn>,
    /// Resize factor from original to pre-pad size.
    pub scale: f32,
    /// Total horizontal padding; `wpad / 2` lands on the left.
    pub wpad: u32,
    /// Total vertical padding; `hpad / 2` lands on the top.
    pub hpad: u32,
    pub padded_width: u32,
    pub padded_height: u32,
    pub orig_width: u32,
    pub orig_height: u32,
}

pub struct Preprocessor {
    /// Length of the long side after resize.
    target_size: u32,
    /// Padded dimensions are rounded up to a multiple of this.
    max_stride: u32,
    pad_value: u8,
    /// Swap R and B before normalization (models trained on BGR input).
    swap_rb: bool,
    normalization: Normalization,
    rgb_buffer: Vec<u8>,
    padded_buffer: Vec<u8>,
}

impl Preprocessor {
    pub fn new(
        target_size: u32,
        max_stride: u32,
        pad_value: u8,
        swap_rb: bool,
        normalization: Normalization,
    ) -> Self {
        Self {
            target_size,
            max_stride,
            pad_value,
            swap_rb,
            normalization,
            rgb_buffer: Vec::with_capacity(1920 * 1080 * 3),
            padded_buffer: Vec::new(),
        }
    }

    /// Resize, pad, and normalize a tightly-packed RGB image.
    pub fn run(&mut self, rgb: &[u8], width: u32, height: u32) -> anyhow::Result<PreprocessOutput> {
        let _s = span!("preprocess");

        let expected = (width * height * 3) as usize;
        if rgb.len() != expected {
            anyhow::bail!(
                "Buffer size mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                rgb.len()
            );
        }

        // Scale so the long side hits target_size.
        let (scale, new_width, new_height) = if width > height {
            let scale = self.target_size as f32 / width as f32;
            (scale, self.target_size, (height as f32 * scale) as u32)
        } else {
            let scale = self.target_size as f32 / height as f32;
            (scale, (width as f32 * scale) as u32, self.target_size)
        };

        tracing::trace!(width, height, new_width, new_height, scale, "Letterbox geometry");

        self.rgb_buffer.clear();
        self.rgb_buffer.extend_from_slice(rgb);

        let src = Image::from_slice_u8(width, height, &mut self.rgb_buffer, PixelType::U8x3)?;
        let mut resized = Image::new(new_width, new_height, PixelType::U8x3);
        Resizer::new().resize(
            &src,
            &mut resized,
            &ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear)),
        )?;

        // Pad up to the next multiple of max_stride, half on each side
        // with the odd pixel going right/bottom.
        let wpad = new_width.div_ceil(self.max_stride) * self.max_stride - new_width;
        let hpad = new_height.div_ceil(self.max_stride) * self.max_stride - new_height;
        let padded_width = new_width + wpad;
        let padded_height = new_height + hpad;

        let row_stride = (padded_width * 3) as usize;
        self.padded_buffer.clear();
        self.padded_buffer
            .resize((padded_height as usize) * row_stride, self.pad_value);

        let resized_data = resized.buffer();
        let left = (wpad / 2) as usize;
        let top = (hpad / 2) as usize;
        for y in 0..new_height as usize {
            let src_row = y * (new_width * 3) as usize;
            let dst_row = (y + top) * row_stride + left * 3;
            self.padded_buffer[dst_row..dst_row + (new_width * 3) as usize]
                .copy_from_slice(&resized_data[src_row..src_row + (new_width * 3) as usize]);
        }

        let tensor = self.normalize(padded_width as usize, padded_height as usize)?;

        Ok(PreprocessOutput {
            tensor,
            scale,
            wpad,
            hpad,
            padded_width,
            padded_height,
            orig_width: width,
            orig_height: height,
        })
    }

    fn normalize(&self, width: usize, height: usize) -> anyhow::Result<Array<f32, IxDyn>> {
        let _s = span!("normalize");

        let spatial = width * height;
        let mut output = vec![0.0f32; 3 * spatial];
        let norm = &self.normalization;

        for (i, px) in self.padded_buffer.chunks_exact(3).enumerate() {
            let (c0, c1, c2) = if self.swap_rb {
                (px[2] as f32, px[1] as f32, px[0] as f32)
            } else {
                (px[0] as f32, px[1] as f32, px[2] as f32)
            };

            output[i] = (c0 - norm.mean[0]) * norm.scale[0];
            output[i + spatial] = (c1 - norm.mean[1]) * norm.scale[1];
            output[i + 2 * spatial] = (c2 - norm.mean[2]) * norm.scale[2];
        }

        Ok(Array::from_shape_vec(
            IxDyn(&[1, 3, height, width]),
            output,
        )?)
    }
}
