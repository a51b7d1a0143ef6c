mod common;

use common::bitmap_block;
use hypercard_reader::{woba, Bitmap, ByteWindow, FileVersion, ImageLayer, Pixel, Rectangle, StackError};

fn decode(stream: &[u8], height: i32, width: i32) -> Bitmap {
    woba::decode_plane(&ByteWindow::new(stream.to_vec()), Rectangle::new(0, 0, height, width))
        .expect("plane should decode")
}

fn rows(bitmap: &Bitmap) -> Vec<Vec<u32>> {
    (0..bitmap.height()).map(|y| bitmap.row(y).to_vec()).collect()
}

#[test]
fn white_then_black_rows() {
    // 5 white rows, then 3 black rows
    let bitmap = decode(&[0xA5, 0x81, 0xA3, 0x82], 8, 32);
    let expected: Vec<Vec<u32>> = (0..8).map(|y| vec![if y < 5 { 0 } else { 0xFFFF_FFFF }]).collect();
    assert_eq!(rows(&bitmap), expected);
}

#[test]
fn remembered_pattern_row_repeats_every_eight_rows() {
    let bitmap = decode(&[0x83, 0xAA, 0xA7, 0x81, 0x84], 9, 32);
    assert_eq!(bitmap.row(0), &[0xAAAA_AAAA]);
    assert_eq!(bitmap.row(8), bitmap.row(0), "row 8 should reuse the byte stored for row 0");
    assert!((1..8).all(|y| bitmap.row(y) == [0]));
}

#[test]
fn pattern_row_defaults_to_gray() {
    let bitmap = decode(&[0xA2, 0x84], 2, 32);
    assert_eq!(rows(&bitmap), vec![vec![0xAAAA_AAAA], vec![0x5555_5555]]);
}

#[test]
fn unknown_opcode_ends_the_plane() {
    let bitmap = decode(&[0x87, 0x82, 0x82], 4, 64);
    assert_eq!(bitmap.count_set(), 0);
}

#[test]
fn uncompressed_rows() {
    let bitmap = decode(&[0x80, 0xDE, 0xAD, 0xBE, 0xEF, 0xA2, 0x80, 0x01, 0x02, 0x03, 0x04], 3, 32);
    assert_eq!(
        rows(&bitmap),
        vec![vec![0xDEAD_BEEF], vec![0x0102_0304], vec![0x0102_0304]]
    );
}

#[test]
fn zero_and_data_byte_runs() {
    // One zero byte then two data bytes, then one data byte
    let bitmap = decode(&[0x21, 0x12, 0x34, 0x10, 0x56], 1, 32);
    assert_eq!(bitmap.row(0), &[0x0012_3456]);
}

#[test]
fn repeat_count_duplicates_byte_runs() {
    let bitmap = decode(&[0xA2, 0x20, 0xAB, 0xCD], 1, 32);
    assert_eq!(bitmap.row(0), &[0xABCD_ABCD]);
}

#[test]
fn repeat_count_resets_at_each_row() {
    // The second row's 0x81 must cover one row only
    let bitmap = decode(&[0xA2, 0x20, 0x11, 0x22, 0x81, 0x82], 3, 32);
    assert_eq!(rows(&bitmap), vec![vec![0x1122_1122], vec![0], vec![0xFFFF_FFFF]]);
}

#[test]
fn long_zero_and_data_runs() {
    let mut stream = vec![0xE1, 0xC2];
    stream.extend(1..=16u8);
    let bitmap = decode(&stream, 1, 256);
    assert_eq!(
        bitmap.row(0),
        &[0, 0, 0, 0, 0x0102_0304, 0x0506_0708, 0x090A_0B0C, 0x0D0E_0F10]
    );
}

#[test]
fn copy_rows_from_above() {
    let bitmap = decode(&[0x83, 0xF0, 0x82, 0xA2, 0x86], 4, 32);
    assert_eq!(
        rows(&bitmap),
        vec![vec![0xF0F0_F0F0], vec![0xFFFF_FFFF], vec![0xF0F0_F0F0], vec![0xFFFF_FFFF]]
    );

    let bitmap = decode(&[0x83, 0x0F, 0xA2, 0x85], 3, 32);
    assert!(rows(&bitmap).iter().all(|row| row == &[0x0F0F_0F0F]));
}

#[test]
fn copy_above_the_top_reads_white() {
    let bitmap = decode(&[0x86, 0x85, 0x82], 3, 32);
    assert_eq!(rows(&bitmap), vec![vec![0], vec![0], vec![0xFFFF_FFFF]]);
}

#[test]
fn horizontal_xor_transform() {
    // dx = 16: every pixel is XORed with the pixels 16, 32, ... to its left
    let bitmap = decode(&[0x88, 0xC1, 0x80, 0, 0, 0, 0, 0, 0, 0], 1, 64);
    assert_eq!(bitmap.row(0), &[0x8000_8000, 0x8000_8000]);

    // dx = 1 turns a single pixel into a run to the end of the row
    let bitmap = decode(&[0x8C, 0x40, 0x00, 0x01, 0x00, 0x00], 1, 32);
    assert_eq!(bitmap.row(0), &[0x0001_FFFF]);

    // Row opcodes skip the transforms
    let bitmap = decode(&[0x8C, 0x80, 0x00, 0x01, 0x00, 0x00], 1, 32);
    assert_eq!(bitmap.row(0), &[0x0001_0000]);
}

#[test]
fn vertical_xor_transform() {
    // dy = 1: each filled row is XORed with the one above; the first row is left alone
    let bitmap = decode(&[0x8A, 0x40, 0xFF, 0x00, 0xFF, 0x00, 0x40, 0x0F, 0x0F, 0x0F, 0x0F], 2, 32);
    assert_eq!(rows(&bitmap), vec![vec![0xFF00_FF00], vec![0xF00F_F00F]]);
}

#[test]
fn transforms_persist_across_rows() {
    let bitmap = decode(&[0x8A, 0x40, 0x01, 0x01, 0x01, 0x01, 0x04, 0x04], 3, 32);
    assert_eq!(rows(&bitmap), vec![vec![0x0101_0101]; 3]);
}

#[test]
fn running_out_of_stream_is_truncation() {
    let result = woba::decode_plane(&ByteWindow::new(vec![0x40, 0x01]), Rectangle::new(0, 0, 1, 32));
    assert!(
        matches!(result, Err(StackError::TruncatedData { .. })),
        "expected TruncatedData, got {:?}",
        result
    );
}

#[test]
fn aligned_rectangles() {
    assert_eq!(
        woba::aligned_32_bits(Rectangle::new(1, 8, 3, 40)),
        Rectangle::new(1, 0, 3, 64)
    );
    assert_eq!(
        woba::aligned_32_bits(Rectangle::new(0, -5, 2, 32)),
        Rectangle::new(0, -32, 2, 32)
    );
}

#[test]
fn decode_masked_bitmap_block() {
    let block = bitmap_block(
        block_id(),
        (0, 0, 4, 64),
        (0, 0, 4, 64),
        (1, 8, 3, 40),
        &[0xA4, 0x82],
        &[0xA2, 0x82],
    );
    let image = woba::decode(&ByteWindow::new(block), FileVersion::V2).expect("bitmap should decode");

    assert_eq!((image.width, image.height), (64, 4));
    match &image.image {
        ImageLayer::Bitmap { rectangle, real_rectangle_in_image, .. } => {
            assert_eq!(*rectangle, Rectangle::new(1, 0, 3, 64));
            assert_eq!(*real_rectangle_in_image, Rectangle::new(0, 8, 2, 40));
        }
        other => panic!("expected a bitmap image layer, got {:?}", other),
    }

    assert_eq!(image.pixel(8, 1), Pixel::Black);
    assert_eq!(image.pixel(39, 2), Pixel::Black);
    assert_eq!(image.pixel(7, 1), Pixel::White, "left of the image rectangle");
    assert_eq!(image.pixel(40, 1), Pixel::White, "right of the image rectangle");
    assert_eq!(image.pixel(8, 0), Pixel::White, "above the image rectangle");
    assert_eq!(image.pixel(64, 0), Pixel::Transparent, "outside the card");
}

#[test]
fn empty_mask_rectangle_is_clear() {
    let block = bitmap_block(block_id(), (0, 0, 2, 32), (0, 0, 0, 0), (0, 0, 2, 32), &[], &[0x82, 0x81]);
    let image = woba::decode(&ByteWindow::new(block), FileVersion::V2).expect("bitmap should decode");

    assert_eq!(image.mask, ImageLayer::Clear);
    assert_eq!(image.pixel(0, 0), Pixel::Black);
    assert_eq!(image.pixel(0, 1), Pixel::Transparent);
}

#[test]
fn block_without_data_uses_bare_rectangles() {
    let block = bitmap_block(block_id(), (0, 0, 10, 10), (0, 0, 10, 10), (2, 2, 4, 4), &[], &[]);
    let image = woba::decode(&ByteWindow::new(block), FileVersion::V2).expect("bitmap should decode");

    assert_eq!(image.image, ImageLayer::Rectangular(Rectangle::new(2, 2, 4, 4)));
    assert_eq!(image.mask, ImageLayer::Rectangular(Rectangle::new(0, 0, 10, 10)));
    assert_eq!(image.pixel(3, 3), Pixel::Black);
    assert_eq!(image.pixel(0, 0), Pixel::White);
}

fn block_id() -> i32 {
    common::block_id(40, 0x01)
}
