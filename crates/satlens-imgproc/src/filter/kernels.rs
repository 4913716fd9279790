/// Radius of the gaussian kernel for a given sigma, `ceil(3 * sigma)` and at least 1.
///
/// The radius is capped at `max_radius`, also when `3 * sigma` overflows.
pub fn gaussian_kernel_radius(sigma: f32, max_radius: usize) -> usize {
    let radius = (3.0 * sigma).ceil();
    let radius = if radius.is_finite() && radius < max_radius as f32 {
        radius as usize
    } else {
        max_radius
    };
    radius.max(1)
}

/// Create a gaussian blur kernel.
///
/// # Arguments
///
/// * `kernel_size` - The size of the kernel.
/// * `sigma` - The sigma of the gaussian kernel.
///
/// # Returns
///
/// A vector of the kernel, normalized to sum to one.
pub fn gaussian_kernel_1d(kernel_size: usize, sigma: f32) -> Vec<f32> {
    let mut kernel = Vec::with_capacity(kernel_size);

    let mean = (kernel_size - 1) as f32 / 2.0;
    let sigma_sq = sigma * sigma;

    // compute the kernel
    for i in 0..kernel_size {
        let x = i as f32 - mean;
        kernel.push((-(x * x) / (2.0 * sigma_sq)).exp());
    }

    // normalize the kernel
    let norm = kernel.iter().sum::<f32>();
    kernel.iter_mut().for_each(|k| *k /= norm);
    kernel
}

/// Create the 1d factors of the 3x3 sobel kernel.
///
/// # Returns
///
/// The derivative kernel `[-1, 0, 1]` and the smoothing kernel `[1, 2, 1]`.
/// The horizontal sobel kernel is the derivative along x and the smoothing
/// along y; the vertical one swaps them.
pub fn sobel_kernel_1d() -> ([f32; 3], [f32; 3]) {
    ([-1.0, 0.0, 1.0], [1.0, 2.0, 1.0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sobel_kernel_1d() {
        let (derivative, smoothing) = sobel_kernel_1d();
        assert_eq!(derivative, [-1.0, 0.0, 1.0]);
        assert_eq!(smoothing, [1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_gaussian_kernel_1d() {
        let kernel = gaussian_kernel_1d(5, 0.5);

        let expected = [
            0.00026386508,
            0.10645077,
            0.78657067,
            0.10645077,
            0.00026386508,
        ];

        for (&k, &e) in kernel.iter().zip(expected.iter()) {
            approx::assert_relative_eq!(k, e, max_relative = 1e-5);
        }
    }

    #[test]
    fn test_gaussian_kernel_sums_to_one() {
        for sigma in [0.01f32, 0.3, 1.0, 2.0, 4.5] {
            let radius = gaussian_kernel_radius(sigma, usize::MAX);
            let kernel = gaussian_kernel_1d(2 * radius + 1, sigma);
            approx::assert_abs_diff_eq!(kernel.iter().sum::<f32>(), 1.0, epsilon = 1e-5);
            assert_eq!(kernel.len(), 2 * radius + 1);
        }
    }

    #[test]
    fn test_gaussian_kernel_radius() {
        assert_eq!(gaussian_kernel_radius(0.001, 100), 1);
        assert_eq!(gaussian_kernel_radius(1.0, 100), 3);
        assert_eq!(gaussian_kernel_radius(2.0, 100), 6);
        assert_eq!(gaussian_kernel_radius(1.1, 100), 4);
    }

    #[test]
    fn test_gaussian_kernel_radius_capped() {
        assert_eq!(gaussian_kernel_radius(10.0, 8), 8);
        assert_eq!(gaussian_kernel_radius(1e30, 8), 8);
        assert_eq!(gaussian_kernel_radius(f32::MAX, 8), 8);
        assert_eq!(gaussian_kernel_radius(1e30, 0), 1);
    }

    #[test]
    fn test_gaussian_kernel_1d_huge_sigma_is_box() {
        let kernel = gaussian_kernel_1d(5, 1e30);
        for &k in &kernel {
            approx::assert_abs_diff_eq!(k, 0.2, epsilon = 1e-6);
        }
    }
}
