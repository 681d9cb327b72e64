//! Laplacian 變異數清晰度評分
//!
//! 先轉為灰階，再以 3x3 Laplacian 核心 `[0 1 0; 1 -4 1; 0 1 0]` 計算二階導數響應，
//! 最後取響應的母體變異數。邊緣越多、越銳利，變異數越高；模糊影格接近 0。

use crate::error::VideoResult;
use crate::tools::Frame;

/// 計算單一影格的清晰度分數
pub fn laplacian_variance(frame: &Frame) -> VideoResult<f64> {
    frame.validate()?;

    let gray = to_grayscale(frame);
    let width = frame.width as usize;
    let height = frame.height as usize;
    let pixel_count = gray.len() as f64;

    let mut sum = 0.0;
    let mut sum_sq = 0.0;

    for y in 0..height {
        let up = reflect_101(y as isize - 1, height) * width;
        let down = reflect_101(y as isize + 1, height) * width;
        let row = y * width;

        for x in 0..width {
            let left = reflect_101(x as isize - 1, width);
            let right = reflect_101(x as isize + 1, width);

            let response = f64::from(gray[up + x])
                + f64::from(gray[down + x])
                + f64::from(gray[row + left])
                + f64::from(gray[row + right])
                - 4.0 * f64::from(gray[row + x]);

            sum += response;
            sum_sq += response * response;
        }
    }

    let mean = sum / pixel_count;
    Ok((sum_sq / pixel_count - mean * mean).max(0.0))
}

/// BT.601 亮度轉換，四捨五入為 8 位元
fn to_grayscale(frame: &Frame) -> Vec<u8> {
    let channels = usize::from(frame.channels);
    if channels == 1 {
        return frame.data.clone();
    }

    frame
        .data
        .chunks_exact(channels)
        .map(|px| {
            let luma = 0.299 * f64::from(px[0]) + 0.587 * f64::from(px[1]) + 0.114 * f64::from(px[2]);
            luma.round().clamp(0.0, 255.0) as u8
        })
        .collect()
}

/// reflect-101 邊界：-1 → 1，n → n-2
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    let mut i = index;
    while i < 0 || i > last {
        if i < 0 {
            i = -i;
        }
        if i > last {
            i = 2 * last - i;
        }
    }
    i as usize
}
