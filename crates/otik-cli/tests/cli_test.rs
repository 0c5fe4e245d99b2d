#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Command-level tests driving `otik_cli::commands` through parsed arguments

use clap::Parser;
use otik_cli::{Cli, CliError, commands};
use otik_formats::archive::{ArchiveWriter, ByteOrder, CodecFlags, PendingEntry};
use pretty_assertions::assert_eq;
use std::path::Path;

fn run(argv: &[&str]) -> (Result<bool, CliError>, String) {
    let cli = Cli::try_parse_from(argv).unwrap();
    let mut out = Vec::new();
    let result = commands::run(&cli.command, &mut out);
    (result, String::from_utf8(out).unwrap())
}

fn write_inputs(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let files = vec![
        ("readme.txt".to_string(), b"hello hello hello, otik archive".repeat(20)),
        ("zeros.bin".to_string(), vec![0u8; 4096]),
        ("empty.dat".to_string(), Vec::new()),
    ];
    for (name, data) in &files {
        std::fs::write(dir.join(name), data).unwrap();
    }
    files
}

fn path_str(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn pack_then_unpack_restores_files() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_inputs(dir.path());
    let archive = dir.path().join("bundle.otik");
    let out_dir = dir.path().join("restored");

    let inputs: Vec<String> = files
        .iter()
        .map(|(name, _)| path_str(&dir.path().join(name)).to_string())
        .collect();
    let mut argv = vec!["otik", "pack", "-o", path_str(&archive), "--huffman", "--hamming", "--r", "5", "--stats", "-i"];
    argv.extend(inputs.iter().map(String::as_str));

    let (result, output) = run(&argv);
    assert!(result.unwrap());
    assert!(output.contains("packed 3 file(s)"), "{output}");
    assert!(output.contains("readme.txt"), "{output}");
    assert!(output.contains("archive size:"), "{output}");

    let (result, output) = run(&["otik", "unpack", "-i", path_str(&archive), "-o", path_str(&out_dir)]);
    assert!(result.unwrap());
    assert!(output.contains("extracted 3 file(s)"), "{output}");
    assert!(output.contains("data checksum: OK"), "{output}");

    for (name, data) in &files {
        assert_eq!(&std::fs::read(out_dir.join(name)).unwrap(), data, "{name}");
    }
}

#[test]
fn pack_skips_missing_inputs() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let archive = dir.path().join("partial.otik");
    let present = dir.path().join("readme.txt");
    let missing = dir.path().join("missing.txt");

    let (result, output) = run(&[
        "otik", "pack", "-o", path_str(&archive), "-i", path_str(&present), path_str(&missing),
    ]);
    assert!(result.unwrap());
    assert!(output.contains("packed 1 file(s)"), "{output}");

    let (result, _) = run(&["otik", "pack", "-o", path_str(&archive), "-i", path_str(&missing)]);
    assert!(matches!(result, Err(CliError::NoInputs)));
}

#[test]
fn info_lists_header_and_entries() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let archive = dir.path().join("info.otik");
    let input = dir.path().join("zeros.bin");

    let (result, _) = run(&[
        "otik", "pack", "-o", path_str(&archive), "-i", path_str(&input),
        "--byte-order", "big", "--huffman",
    ]);
    assert!(result.unwrap());

    let (result, output) = run(&["otik", "info", "-i", path_str(&archive)]);
    assert!(result.unwrap());
    assert!(output.contains(&hex::encode(b"DBP-OTIK-HFHM\0\0\0")), "{output}");
    assert!(output.contains("byte order:           big"), "{output}");
    assert!(output.contains("huffman|crc32"), "{output}");
    assert!(output.contains("file count:           1"), "{output}");
    assert!(output.contains("  zeros.bin"), "{output}");
    assert!(output.contains("original size:   4096"), "{output}");
}

#[test]
fn verify_reports_data_checksum() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let archive = dir.path().join("verify.otik");
    let input = dir.path().join("readme.txt");

    run(&["otik", "pack", "-o", path_str(&archive), "-i", path_str(&input)])
        .0
        .unwrap();

    let (result, output) = run(&["otik", "verify", "-i", path_str(&archive)]);
    assert!(result.unwrap());
    assert_eq!(output, "data checksum: OK\n");

    // Damage the last byte of the data section
    let mut bytes = std::fs::read(&archive).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    std::fs::write(&archive, bytes).unwrap();

    let (result, output) = run(&["otik", "verify", "-i", path_str(&archive)]);
    assert!(!result.unwrap());
    assert_eq!(output, "data checksum: MISMATCH\n");
}

#[test]
fn unpack_refuses_escaping_names() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("evil.otik");
    let out_dir = dir.path().join("out");

    let mut writer = ArchiveWriter::new(&archive, ByteOrder::Little);
    writer
        .add_entry(PendingEntry {
            name: "../escaped.txt".to_string(),
            payload: b"gotcha".to_vec(),
            original_size: 6,
            flags: CodecFlags::default(),
            control_bits: 0,
            padding_huffman: 0,
            padding_hamming: 0,
            code_table: None,
        })
        .unwrap();
    writer.finalize().unwrap();

    let (result, _) = run(&["otik", "unpack", "-i", path_str(&archive), "-o", path_str(&out_dir)]);
    assert!(matches!(result, Err(CliError::UnsafeEntryName(name)) if name == "../escaped.txt"));
    assert!(!dir.path().join("escaped.txt").exists());
}

#[test]
fn unpack_rejects_damaged_payload() {
    let dir = tempfile::tempdir().unwrap();
    write_inputs(dir.path());
    let archive = dir.path().join("damaged.otik");
    let out_dir = dir.path().join("out");
    let input = dir.path().join("readme.txt");

    run(&["otik", "pack", "-o", path_str(&archive), "-i", path_str(&input)])
        .0
        .unwrap();
    let mut bytes = std::fs::read(&archive).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0x01;
    std::fs::write(&archive, bytes).unwrap();

    let (result, _) = run(&["otik", "unpack", "-i", path_str(&archive), "-o", path_str(&out_dir)]);
    match result {
        Err(CliError::Archive(err)) => assert!(err.is_integrity_error(), "{err}"),
        other => panic!("expected integrity error, got {other:?}"),
    }
    assert!(!out_dir.join("readme.txt").exists());
}
