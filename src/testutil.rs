use image::{GrayImage, Luma, Rgb, RgbImage};

/// 行ごとに相関の低い決定的なグレースケールのテストパターンを生成
pub(crate) fn gray_pattern(width: u32, height: u32, row_offset: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        Luma([pattern_value(x, y + row_offset, 0)])
    })
}

/// 行ごとに相関の低い決定的なカラーのテストパターンを生成
pub(crate) fn rgb_pattern(width: u32, height: u32, row_offset: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            pattern_value(x, y + row_offset, 0),
            pattern_value(x, y + row_offset, 1),
            pattern_value(x, y + row_offset, 2),
        ])
    })
}

fn pattern_value(x: u32, y: u32, channel: u32) -> u8 {
    let v = x
        .wrapping_mul(31)
        .wrapping_add(y.wrapping_mul(127))
        .wrapping_add(channel.wrapping_mul(59))
        .wrapping_mul(2654435761);
    (v >> 24) as u8
}

/// 固定のヘッダ・フッタと、縦長パターンをscroll行分スクロールした
/// ウィンドウ領域を持つ合成フレームを生成
pub(crate) fn scroll_frame(
    width: u32,
    header_height: u32,
    window_height: u32,
    footer_height: u32,
    scroll: u32,
) -> RgbImage {
    let height = header_height + window_height + footer_height;
    let mut frame = RgbImage::new(width, height);

    let header = rgb_pattern(width, header_height, 100_000);
    let window = rgb_pattern(width, window_height, 200_000 + scroll);
    let footer = rgb_pattern(width, footer_height, 300_000);

    image::imageops::replace(&mut frame, &header, 0, 0);
    image::imageops::replace(&mut frame, &window, 0, header_height as i64);
    image::imageops::replace(
        &mut frame,
        &footer,
        0,
        (header_height + window_height) as i64,
    );

    frame
}
