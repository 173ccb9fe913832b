use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Cursor, Read, Write},
    path::Path,
};

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xb5, 0x2f, 0xfd];

/// One executed conditional branch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, PartialEq, Eq)]
pub struct BranchRecord {
    pub pc: u32,
    pub taken: bool,
}

impl BranchRecord {
    pub fn new(pc: u32, taken: bool) -> Self {
        Self { pc, taken }
    }
}

/// Parse one `<hex pc> <0|1>` line, `None` for blank lines
fn parse_line(line: &str) -> anyhow::Result<Option<BranchRecord>> {
    let mut fields = line.split_whitespace();
    let Some(pc) = fields.next() else {
        return Ok(None);
    };
    let Some(outcome) = fields.next() else {
        bail!("missing outcome after pc '{pc}'");
    };
    if let Some(extra) = fields.next() {
        bail!("unexpected trailing field '{extra}'");
    }

    let digits = pc
        .strip_prefix("0x")
        .or_else(|| pc.strip_prefix("0X"))
        .unwrap_or(pc);
    let pc = u32::from_str_radix(digits, 16)
        .with_context(|| format!("invalid branch address '{pc}'"))?;
    let taken = match outcome {
        "0" => false,
        "1" => true,
        _ => bail!("invalid outcome '{outcome}', expected 0 or 1"),
    };
    Ok(Some(BranchRecord { pc, taken }))
}

/// Parse a text trace, one `<hex pc> <0|1>` record per line
pub fn parse_trace<R: BufRead>(reader: R) -> anyhow::Result<Vec<BranchRecord>> {
    let mut records = vec![];
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if let Some(record) = parse_line(&line).with_context(|| format!("line {}", i + 1))? {
            records.push(record);
        }
    }
    Ok(records)
}

/// Read a trace file, decompressing it first if it is zstd compressed
pub fn read_trace<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<BranchRecord>> {
    let path = path.as_ref();
    let content =
        std::fs::read(path).with_context(|| format!("Failed to read trace {}", path.display()))?;

    let records = if content.starts_with(&ZSTD_MAGIC) {
        let decoder = zstd::stream::read::Decoder::new(Cursor::new(&content[..]))?;
        parse_trace(BufReader::new(decoder))
    } else {
        parse_trace(Cursor::new(&content[..]))
    };
    records.with_context(|| format!("Failed to parse trace {}", path.display()))
}

/// Write records in the text format, optionally zstd compressed
pub fn write_trace<P: AsRef<Path>>(
    path: P,
    records: &[BranchRecord],
    compress: bool,
) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer: Box<dyn Write> = if compress {
        Box::new(zstd::Encoder::new(BufWriter::new(file), 0)?.auto_finish())
    } else {
        Box::new(BufWriter::new(file))
    };
    for record in records {
        writeln!(writer, "0x{:08x} {}", record.pc, record.taken as u8)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read everything from `reader` into a trace, used for stdin
pub fn read_trace_from<R: Read>(mut reader: R) -> anyhow::Result<Vec<BranchRecord>> {
    let mut content = vec![];
    reader.read_to_end(&mut content)?;
    if content.starts_with(&ZSTD_MAGIC) {
        let decoder = zstd::stream::read::Decoder::new(Cursor::new(&content[..]))?;
        parse_trace(BufReader::new(decoder))
    } else {
        parse_trace(Cursor::new(&content[..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let text = "0x00400100 1\n\n400104 0\n  0XFFFFFFFF   1  \n";
        let records = parse_trace(Cursor::new(text)).unwrap();
        assert_eq!(
            records,
            vec![
                BranchRecord::new(0x400100, true),
                BranchRecord::new(0x400104, false),
                BranchRecord::new(0xffff_ffff, true),
            ]
        );
    }

    #[test]
    fn test_parse_errors_name_the_line() {
        let error = parse_trace(Cursor::new("0x10 1\n0x14 2\n")).unwrap_err();
        assert_eq!(error.to_string(), "line 2");
        assert!(format!("{error:#}").contains("invalid outcome '2'"));

        assert!(parse_trace(Cursor::new("0x10\n")).is_err());
        assert!(parse_trace(Cursor::new("zzz 1\n")).is_err());
        assert!(parse_trace(Cursor::new("0x10 1 extra\n")).is_err());
        // does not fit in 32 bits
        assert!(parse_trace(Cursor::new("0x100000000 1\n")).is_err());
    }

    #[test]
    fn test_read_plain_and_compressed() {
        let records = vec![
            BranchRecord::new(0x1000, true),
            BranchRecord::new(0x1004, false),
            BranchRecord::new(0x1000, true),
        ];
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("trace.txt");
        write_trace(&plain, &records, false).unwrap();
        assert_eq!(read_trace(&plain).unwrap(), records);

        let compressed = dir.path().join("trace.txt.zst");
        write_trace(&compressed, &records, true).unwrap();
        let content = std::fs::read(&compressed).unwrap();
        assert!(content.starts_with(&ZSTD_MAGIC));
        assert_eq!(read_trace(&compressed).unwrap(), records);
        assert_eq!(read_trace_from(Cursor::new(content)).unwrap(), records);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let error = read_trace(dir.path().join("missing")).unwrap_err();
        assert!(error.to_string().starts_with("Failed to read trace"));
    }
}
