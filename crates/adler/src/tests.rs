use std::io::Write;

use super::adler32;
use super::Adler32;
use super::MODULUS;

/// Byte-at-a-time reference, reducing after every byte.
fn reference(bytes: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;
    for &x in bytes {
        a = (a + u32::from(x)) % MODULUS;
        b = (a + b) % MODULUS;
    }
    (b << 16) | a
}

#[test]
fn test_empty_is_one() {
    assert_eq!(adler32(&[]), 1);
    assert_eq!(Adler32::new().finish(), 1);
}

#[test]
fn test_known_vectors() {
    assert_eq!(adler32(&[0x61, 0x62, 0x63, 0x64, 0x65]), 0x05C8_01F0);
    assert_eq!(adler32(b"Wikipedia"), 0x11E6_0398);
    assert_eq!(adler32(b"a"), 0x0062_0062);
}

#[test]
fn test_every_split_matches_one_shot() {
    let input = b"The quick brown fox jumps over the lazy dog";
    let whole = adler32(input);

    for at in 0..=input.len() {
        let (head, tail) = input.split_at(at);
        let mut sum = Adler32::new();
        sum.update(head);
        sum.update(tail);
        assert_eq!(sum.finish(), whole, "split at {}", at);
    }
}

#[test]
fn test_deferred_reduction_matches_reference() {
    // Worst case for overflow: every byte 0xFF, spanning several blocks.
    let ones = vec![0xFFu8; 5552 * 3 + 17];
    assert_eq!(adler32(&ones), reference(&ones));

    let ramp: Vec<u8> = (0..100_000u32).map(|i| (i * 31 % 251) as u8).collect();
    assert_eq!(adler32(&ramp), reference(&ramp));
}

#[test]
fn test_uneven_chunks_match_reference() {
    let data: Vec<u8> = (0..20_000u32).map(|i| (i ^ (i >> 3)) as u8).collect();
    let mut sum = Adler32::new();
    let mut rest = &data[..];
    let mut step = 1;
    while !rest.is_empty() {
        let n = step.min(rest.len());
        sum.update(&rest[..n]);
        rest = &rest[n..];
        step = step * 3 % 7919 + 1;
    }
    assert_eq!(sum.finish(), reference(&data));
}

#[test]
fn test_write_streams_like_update() {
    let data = vec![7u8; 12_345];
    let mut sum = Adler32::default();
    std::io::copy(&mut &data[..], &mut sum).unwrap();
    sum.flush().unwrap();
    assert_eq!(sum.finish(), adler32(&data));
}

#[test]
fn test_resume_from_checksum() {
    let mut first = Adler32::new();
    first.update(b"hello ");
    let mut resumed = Adler32::from_checksum(first.finish());
    resumed.update(b"world");
    assert_eq!(resumed.finish(), adler32(b"hello world"));
}

#[test]
fn test_reset_restarts() {
    let mut sum = Adler32::new();
    sum.update(b"garbage");
    sum.reset();
    sum.update(b"abcde");
    assert_eq!(sum.finish(), 0x05C8_01F0);
}

#[test]
fn test_sums_stay_reduced() {
    let mut sum = Adler32::new();
    sum.update(&vec![0xFFu8; 70_000]);
    let value = sum.finish();
    assert!(value & 0xffff < MODULUS);
    assert!(value >> 16 < MODULUS);
}
