//! Square-layout 2-D convolution geometry shared by the forward pass and
//! convolutional STDP.
//!
//! Flat source index: `(h * W + w) * C + c`.
//! Flat output index: `(ho * W_out + wo) * F + f`.
//! Stride is fixed at 1; the kernel is applied as a cross-correlation.

use ndarray::{s, Array1, Array3, ArrayView1, ArrayView4, Zip};
use snn_core::{SnnError, SnnResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvGeometry {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub n_filters: usize,
}

impl ConvGeometry {
    /// Infer the spatial layout of a flat source of `src_size` elements.
    ///
    /// Without an explicit channel count the side is `floor(sqrt(size))` and
    /// the channel count is whatever remains. Padding, when requested, is
    /// `kernel / 2` on each axis.
    pub fn infer(
        src_size: usize,
        kernel_size: (usize, usize),
        n_filters: usize,
        padding: bool,
        channels: Option<usize>,
    ) -> SnnResult<Self> {
        let (kernel_h, kernel_w) = kernel_size;
        if kernel_h == 0 || kernel_w == 0 {
            return Err(SnnError::InvalidGeometry("kernel dimensions must be positive"));
        }
        if n_filters == 0 {
            return Err(SnnError::InvalidGeometry("n_filters must be positive"));
        }
        if src_size == 0 {
            return Err(SnnError::InvalidGeometry("source population is empty"));
        }

        let (side, channels) = match channels {
            Some(0) => return Err(SnnError::InvalidGeometry("channels_in must be positive")),
            Some(c) => {
                if src_size % c != 0 {
                    return Err(SnnError::NonSquareLayout { size: src_size, channels: c });
                }
                (integer_sqrt(src_size / c), c)
            }
            None => {
                let side = integer_sqrt(src_size);
                (side, src_size / (side * side))
            }
        };
        if side * side * channels != src_size {
            return Err(SnnError::NonSquareLayout { size: src_size, channels });
        }

        let (pad_h, pad_w) = if padding {
            (kernel_h / 2, kernel_w / 2)
        } else {
            (0, 0)
        };

        let geometry = Self {
            height: side,
            width: side,
            channels,
            kernel_h,
            kernel_w,
            pad_h,
            pad_w,
            n_filters,
        };
        let (field_h, field_w) = geometry.padded_dims();
        if kernel_h > field_h || kernel_w > field_w {
            return Err(SnnError::KernelTooLarge {
                kernel_h,
                kernel_w,
                field_h,
                field_w,
            });
        }
        Ok(geometry)
    }

    pub fn padded_dims(&self) -> (usize, usize) {
        (self.height + 2 * self.pad_h, self.width + 2 * self.pad_w)
    }

    pub fn output_dims(&self) -> (usize, usize) {
        let (field_h, field_w) = self.padded_dims();
        (field_h - self.kernel_h + 1, field_w - self.kernel_w + 1)
    }

    pub fn source_size(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Number of destination neurons the projection writes to.
    pub fn output_size(&self) -> usize {
        let (h_out, w_out) = self.output_dims();
        h_out * w_out * self.n_filters
    }

    /// `(kernel_h, kernel_w, channels, n_filters)`
    pub fn kernel_shape(&self) -> (usize, usize, usize, usize) {
        (self.kernel_h, self.kernel_w, self.channels, self.n_filters)
    }

    /// Reshape a flat source vector to `(H, W, C)` and zero-pad it spatially.
    pub fn pad_field(&self, activity: ArrayView1<f64>) -> Array3<f64> {
        assert_eq!(
            activity.len(),
            self.source_size(),
            "source size does not match the inferred layout"
        );
        let (field_h, field_w) = self.padded_dims();
        let (h, w, c) = (self.height, self.width, self.channels);
        let (pad_h, pad_w) = (self.pad_h, self.pad_w);

        Array3::from_shape_fn((field_h, field_w, c), |(row, col, ch)| {
            if row < pad_h || col < pad_w || row >= pad_h + h || col >= pad_w + w {
                0.0
            } else {
                activity[((row - pad_h) * w + (col - pad_w)) * c + ch]
            }
        })
    }

    /// Output positions in flat order: `(ho, wo, position index)`.
    pub fn positions(&self) -> impl Iterator<Item = (usize, usize, usize)> {
        let (h_out, w_out) = self.output_dims();
        (0..h_out).flat_map(move |ho| (0..w_out).map(move |wo| (ho, wo, ho * w_out + wo)))
    }

    /// Weight-shared forward pass: every output position contracts its
    /// `kernel_h x kernel_w x C` window against each filter.
    pub fn forward(&self, activity: ArrayView1<f64>, kernel: ArrayView4<f64>) -> Array1<f64> {
        assert_eq!(kernel.dim(), self.kernel_shape(), "kernel shape does not match the geometry");
        let field = self.pad_field(activity);
        let mut out = Array1::zeros(self.output_size());

        for (ho, wo, p) in self.positions() {
            let window = field.slice(s![ho..ho + self.kernel_h, wo..wo + self.kernel_w, ..]);
            for f in 0..self.n_filters {
                let filter = kernel.slice(s![.., .., .., f]);
                out[p * self.n_filters + f] = Zip::from(&window)
                    .and(&filter)
                    .fold(0.0, |acc, &x, &k| acc + x * k);
            }
        }
        out
    }
}

fn integer_sqrt(n: usize) -> usize {
    let mut root = (n as f64).sqrt() as usize;
    while root * root > n {
        root -= 1;
    }
    while (root + 1) * (root + 1) <= n {
        root += 1;
    }
    root
}
