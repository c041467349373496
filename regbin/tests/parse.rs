// Copyright 2024 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

mod common;

use assert_matches::assert_matches;
use common::*;
use regbin::parse_block;
use regbin::parse_profile;
use regbin::Container;
use regbin::DecodeError;
use regbin::Directive;
use regbin::ParseSettings;
use regbin::Phase;
use regbin::BLOCK_HEADER_SIZE;

fn sentinel() -> Vec<u8> {
    block(0, 5, &[delay(0x1234)])
}

fn first_block() -> Vec<u8> {
    block(
        1,
        2,
        &[
            single_write(&[(0, 0, 1, 2), (0, 1, 3, 4)]),
            burst_write(0, 0x2c, 0x0c, &[1, 2, 3, 4, 5, 6, 7, 8]),
            delay(5),
            field_write(0x0f, 0, 0, 0x02, 0x01),
        ],
    )
}

#[test]
fn corrupt_directives_never_shift_the_next_block() {
    let first = first_block();
    for pos in BLOCK_HEADER_SIZE..first.len() {
        for garbage in [0x00, 0x01, 0x02, 0x03, 0x04, 0x7f, 0xff] {
            let mut corrupted = first.clone();
            corrupted[pos] = garbage;
            let bytes = profile(None, &[corrupted, sentinel()]);
            let parsed = parse_profile(&bytes, UNNAMED, &ParseSettings::default()).unwrap();
            let last = parsed.profile.blocks.last().unwrap();
            assert_eq!(last.phase, Phase::PostShutdown, "byte {pos} = {garbage:#x}");
            assert_eq!(
                last.directives,
                vec![Directive::Delay {
                    milliseconds: 0x1234
                }],
                "byte {pos} = {garbage:#x}"
            );
        }
    }
}

#[test]
fn profile_sizes_reconcile() {
    let blob = image(
        NAMED,
        &[0x4c, 0x4d],
        &[
            profile(Some("speaker"), &[first_block(), sentinel()]),
            profile(Some("calibration"), &[sentinel()]),
        ],
    );
    let c = Container::parse(&blob, &ParseSettings::default()).unwrap();
    assert!(c.issues().is_empty(), "{:?}", c.issues());
    for (p, &size) in c.profiles.iter().zip(&c.header.profile_byte_sizes) {
        let blocks: usize = p
            .blocks
            .iter()
            .map(|b| b.declared_byte_size as usize)
            .sum();
        assert_eq!(
            blocks + BLOCK_HEADER_SIZE * p.blocks.len() + regbin::PROFILE_NAME_SIZE + 4,
            size as usize
        );
    }
}

#[test]
fn truncated_block_never_panics() {
    let whole = first_block();
    for end in 0..whole.len() {
        let parsed = parse_block(&whole[..end]);
        match parsed.block {
            Err(e) => assert_matches!(
                e,
                DecodeError::OutOfBounds { .. } | DecodeError::Truncated { .. }
            ),
            Ok(_) => panic!("block cut at {end} parsed"),
        }
    }
}

#[test]
fn truncated_image_is_rejected() {
    let blob = image(
        UNNAMED,
        &[0x4c],
        &[profile(None, &[first_block(), sentinel()])],
    );
    for end in 0..blob.len() {
        assert_matches!(
            Container::parse(&blob[..end], &ParseSettings::default()),
            Err(DecodeError::TruncatedHeader(_) | DecodeError::SizeMismatch { .. }),
            "image cut at {end}"
        );
    }
}

#[test]
fn parsing_is_deterministic() {
    let blob = image(
        UNNAMED,
        &[0x4c],
        &[profile(None, &[first_block(), sentinel()])],
    );
    let settings = ParseSettings::default();
    assert_eq!(
        Container::parse(&blob, &settings).unwrap(),
        Container::parse(&blob, &settings).unwrap()
    );
}

#[test]
fn profile_with_unusable_blocks_still_selectable() {
    let blob = image(
        UNNAMED,
        &[0x4c],
        &[profile(
            None,
            &[raw_block(0, 0, 1, &delay(1)), sentinel()],
        )],
    );
    let c = Container::parse(&blob, &ParseSettings::default()).unwrap();
    let p = c.profile(1).unwrap();
    assert_eq!(p.declared_block_count, 2);
    assert_eq!(p.blocks.len(), 1);
    assert!(!p.is_complete());
    assert_matches!(c.issues(), [issue] if issue.error == DecodeError::UnknownPhase(0));
}
