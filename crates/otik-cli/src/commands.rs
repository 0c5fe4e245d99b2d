//! `pack`, `unpack`, `info` and `verify`.
//!
//! Each command writes its human-readable report to the supplied writer and
//! logs progress through `tracing`. Commands that check the data section
//! return `Ok(false)` on a checksum mismatch so the caller can pick an exit
//! status.

use crate::config::{Command, InspectArgs, PackArgs, UnpackArgs};
use crate::error::{CliError, CliResult};
use otik_formats::archive::{ArchiveHeader, ArchiveReader, ArchiveSummary, FileTableRecord};
use otik_formats::hamming::CorrectionReport;
use otik_formats::pipeline::{ArchivePacker, decode_entry};
use std::ffi::OsStr;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Run one subcommand
pub fn run<W: Write>(command: &Command, out: &mut W) -> CliResult<bool> {
    match command {
        Command::Pack(args) => {
            pack(args, out)?;
            Ok(true)
        }
        Command::Unpack(args) => unpack(args, out),
        Command::Info(args) => {
            info(args, out)?;
            Ok(true)
        }
        Command::Verify(args) => verify(args, out),
    }
}

/// Pack the inputs into a new archive
///
/// Inputs that do not exist are skipped with a warning; at least one must
/// remain.
pub fn pack<W: Write>(args: &PackArgs, out: &mut W) -> CliResult<ArchiveSummary> {
    let options = args.encode_options();
    let mut packer = ArchivePacker::new(&args.output, args.byte_order.into());
    packer.set_flags(args.archive_flags());

    for path in &args.input {
        if !path.is_file() {
            warn!(path = %path.display(), "skipping missing input");
            continue;
        }
        let name = entry_name(path)?;
        let data = fs::read(path).map_err(|source| CliError::ReadInput {
            path: path.clone(),
            source,
        })?;
        info!(name = %name, bytes = data.len(), "queued input");
        packer.add(name, data, options)?;
    }

    if packer.is_empty() {
        return Err(CliError::NoInputs);
    }

    let summary = packer.finish()?;
    writeln!(
        out,
        "packed {} file(s) into {}",
        summary.file_count,
        summary.path.display()
    )?;

    if args.stats {
        write_stats(&summary, out)?;
    }
    Ok(summary)
}

fn write_stats<W: Write>(summary: &ArchiveSummary, out: &mut W) -> CliResult<()> {
    writeln!(out, "{:<32} {:>12} {:>12} {:>8}", "name", "original", "stored", "ratio")?;
    for entry in &summary.entries {
        writeln!(
            out,
            "{:<32} {:>12} {:>12} {:>7.1}%",
            entry.name,
            entry.original_size,
            entry.stored_size,
            entry.ratio() * 100.0
        )?;
    }
    writeln!(out, "archive size: {} bytes", summary.archive_size)?;
    Ok(())
}

/// Extract every entry into the output directory
///
/// Stops at the first failing entry. Files extracted before it stay on disk.
pub fn unpack<W: Write>(args: &UnpackArgs, out: &mut W) -> CliResult<bool> {
    let mut archive = ArchiveReader::open_path(&args.input)?;
    fs::create_dir_all(&args.output).map_err(|source| CliError::WriteOutput {
        path: args.output.clone(),
        source,
    })?;

    let table = archive.header().code_table.clone();
    let mut total = CorrectionReport::default();
    let mut extracted = 0usize;

    for entry in archive.entries() {
        let entry = entry?;
        let target = safe_output_path(&args.output, &entry.record.name)?;
        let decoded = decode_entry(&entry.record, &entry.payload, &table)?;

        if !decoded.report.is_clean() {
            warn!(
                name = %entry.record.name,
                corrected = decoded.report.corrected,
                uncorrectable = decoded.report.uncorrectable,
                "hamming blocks repaired or damaged"
            );
        }
        total.merge(decoded.report);

        fs::write(&target, &decoded.data).map_err(|source| CliError::WriteOutput {
            path: target.clone(),
            source,
        })?;
        info!(name = %entry.record.name, bytes = decoded.data.len(), "extracted entry");
        extracted += 1;
    }

    let data_ok = archive.verify_data_section()?;
    writeln!(
        out,
        "extracted {extracted} file(s) to {}",
        args.output.display()
    )?;
    if !total.is_clean() {
        writeln!(
            out,
            "hamming: {} block(s) corrected, {} uncorrectable",
            total.corrected, total.uncorrectable
        )?;
    }
    writeln!(out, "data checksum: {}", checksum_label(data_ok))?;
    Ok(data_ok)
}

/// Print header fields and entry metadata without decoding payloads
pub fn info<W: Write>(args: &InspectArgs, out: &mut W) -> CliResult<()> {
    let archive = ArchiveReader::open_path(&args.input)?;
    write_header(archive.header(), out)?;

    writeln!(out, "entries:")?;
    for record in archive.records() {
        write_record(record, out)?;
    }
    Ok(())
}

fn write_header<W: Write>(header: &ArchiveHeader, out: &mut W) -> CliResult<()> {
    writeln!(out, "signature:            {}", hex::encode(header.signature))?;
    writeln!(out, "version:              {}", header.version)?;
    writeln!(
        out,
        "flags:                {} (0x{:08x})",
        header.flags, header.flags.value
    )?;
    writeln!(out, "archive size:         {}", header.archive_size)?;
    writeln!(out, "data crc32:           0x{:08x}", header.data_crc32)?;
    writeln!(out, "header crc32:         0x{:08x}", header.header_crc32)?;
    writeln!(out, "byte order:           {}", header.byte_order)?;
    writeln!(out, "align:                {}", header.align)?;
    writeln!(out, "file count:           {}", header.file_count)?;
    writeln!(out, "data section offset:  {}", header.data_section_offset)?;
    writeln!(out, "index section offset: {}", header.index_section_offset)?;
    writeln!(
        out,
        "code table:           {} symbol(s), max length {}",
        header.code_table.symbol_count(),
        header.code_table.max_length()
    )?;
    Ok(())
}

fn write_record<W: Write>(record: &FileTableRecord, out: &mut W) -> CliResult<()> {
    writeln!(out, "  {}", record.name)?;
    writeln!(out, "    original size:   {}", record.original_size)?;
    writeln!(out, "    stored size:     {}", record.compressed_size)?;
    writeln!(out, "    flags:           {}", record.flags)?;
    writeln!(out, "    hamming r:       {}", record.control_bits)?;
    writeln!(out, "    data offset:     {}", record.data_offset)?;
    writeln!(out, "    payload crc32:   0x{:08x}", record.payload_crc32)?;
    Ok(())
}

/// Report only the data-section checksum
pub fn verify<W: Write>(args: &InspectArgs, out: &mut W) -> CliResult<bool> {
    let mut archive = ArchiveReader::open_path(&args.input)?;
    let ok = archive.verify_data_section()?;
    writeln!(out, "data checksum: {}", checksum_label(ok))?;
    Ok(ok)
}

const fn checksum_label(ok: bool) -> &'static str {
    if ok { "OK" } else { "MISMATCH" }
}

fn entry_name(path: &Path) -> CliResult<String> {
    path.file_name()
        .and_then(OsStr::to_str)
        .map(str::to_owned)
        .ok_or_else(|| CliError::InvalidInputName(path.to_path_buf()))
}

/// Join `name` onto `dir` if it is exactly one normal path component
fn safe_output_path(dir: &Path, name: &str) -> CliResult<PathBuf> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(part)), None) if part == OsStr::new(name) => Ok(dir.join(part)),
        _ => Err(CliError::UnsafeEntryName(name.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_safe_output_path() {
        let dir = Path::new("out");
        assert_eq!(
            safe_output_path(dir, "file.txt").unwrap(),
            PathBuf::from("out/file.txt")
        );
        for bad in ["", ".", "..", "../x", "a/b", "/etc/passwd", "dir/"] {
            assert!(
                matches!(safe_output_path(dir, bad), Err(CliError::UnsafeEntryName(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_entry_name_uses_file_name() {
        assert_eq!(entry_name(Path::new("some/dir/data.bin")).unwrap(), "data.bin");
        assert!(matches!(
            entry_name(Path::new("/")),
            Err(CliError::InvalidInputName(_))
        ));
    }

    #[test]
    fn test_checksum_label() {
        assert_eq!(checksum_label(true), "OK");
        assert_eq!(checksum_label(false), "MISMATCH");
    }
}
