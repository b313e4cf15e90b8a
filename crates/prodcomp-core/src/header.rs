//! Package header extraction.
//!
//! [`HeaderSource`] is the seam between the pool and the package container
//! format. [`RpmHeaderReader`] parses the header section of an RPM file
//! (lead, signature header, main header) without touching the payload;
//! [`FilenameNevra`] trusts `name-[epoch:]version-release.arch.rpm` file
//! names and is used for quick scans of well-named trees.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use prodcomp_util::errors::ComposeError;

const LEAD_SIZE: usize = 96;
const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];
const HEADER_MAGIC: [u8; 3] = [0x8e, 0xad, 0xe8];
/// Upper bound for a single header section; real headers stay well below.
const MAX_HEADER_BYTES: usize = 256 * 1024 * 1024;

const TAG_NAME: u32 = 1000;
const TAG_VERSION: u32 = 1001;
const TAG_RELEASE: u32 = 1002;
const TAG_EPOCH: u32 = 1003;
const TAG_BUILDTIME: u32 = 1006;
const TAG_LICENSE: u32 = 1014;
const TAG_ARCH: u32 = 1022;
const TAG_SOURCERPM: u32 = 1044;
const TAG_PROVIDENAME: u32 = 1047;
const TAG_NOSOURCE: u32 = 1051;
const TAG_NOPATCH: u32 = 1052;
const TAG_PROVIDEFLAGS: u32 = 1112;
const TAG_PROVIDEVERSION: u32 = 1113;
const TAG_DISTURL: u32 = 1123;

const SENSE_LESS: u32 = 0x02;
const SENSE_GREATER: u32 = 0x04;
const SENSE_EQUAL: u32 = 0x08;

/// Header metadata the pool needs from one package file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageHeader {
    pub name: String,
    pub epoch: Option<String>,
    pub version: String,
    pub release: String,
    /// Effective architecture; `src`/`nosrc` for source packages.
    pub arch: String,
    pub sourcerpm: Option<String>,
    pub license: Option<String>,
    pub buildtime: Option<u64>,
    pub disturl: Option<String>,
    /// Provides rendered as `name [op version]`.
    pub provides: Vec<String>,
}

/// Something that can turn a package file into its header metadata.
pub trait HeaderSource {
    fn read_header(&self, path: &Path) -> Result<PackageHeader, ComposeError>;
}

/// Reads headers straight from RPM files.
#[derive(Debug, Default, Clone, Copy)]
pub struct RpmHeaderReader;

impl HeaderSource for RpmHeaderReader {
    fn read_header(&self, path: &Path) -> Result<PackageHeader, ComposeError> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        parse_rpm(&mut reader).map_err(|message| ComposeError::Header {
            path: path.display().to_string(),
            message,
        })
    }
}

/// Derives header metadata from the file name alone.
#[derive(Debug, Default, Clone, Copy)]
pub struct FilenameNevra;

impl HeaderSource for FilenameNevra {
    fn read_header(&self, path: &Path) -> Result<PackageHeader, ComposeError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let nevra = split_nevra(&file_name).ok_or_else(|| ComposeError::Header {
            path: path.display().to_string(),
            message: "file name is not of the form name-version-release.arch.rpm".to_string(),
        })?;
        Ok(PackageHeader {
            name: nevra.name,
            epoch: nevra.epoch,
            version: nevra.version,
            release: nevra.release,
            arch: nevra.arch,
            ..Default::default()
        })
    }
}

/// Components of a `name-[epoch:]version-release.arch[.rpm]` string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nevra {
    pub name: String,
    pub epoch: Option<String>,
    pub version: String,
    pub release: String,
    pub arch: String,
}

/// Split a NEVRA string (a trailing `.rpm` is stripped).
pub fn split_nevra(s: &str) -> Option<Nevra> {
    let s = s.strip_suffix(".rpm").unwrap_or(s);
    let (nevr, arch) = s.rsplit_once('.')?;
    let (nev, release) = nevr.rsplit_once('-')?;
    let (name, ev) = nev.rsplit_once('-')?;
    if name.is_empty() || ev.is_empty() || release.is_empty() || arch.is_empty() {
        return None;
    }
    let (epoch, version) = match ev.split_once(':') {
        Some((e, v)) => (Some(e.to_string()), v.to_string()),
        None => (None, ev.to_string()),
    };
    Some(Nevra {
        name: name.to_string(),
        epoch,
        version,
        release: release.to_string(),
        arch: arch.to_string(),
    })
}

#[derive(Debug, Clone)]
enum TagValue {
    Int(Vec<u64>),
    Str(Vec<String>),
    Other,
}

struct Header {
    tags: HashMap<u32, TagValue>,
}

impl Header {
    fn string(&self, tag: u32) -> Option<String> {
        match self.tags.get(&tag) {
            Some(TagValue::Str(values)) => values.first().cloned(),
            _ => None,
        }
    }

    fn strings(&self, tag: u32) -> Vec<String> {
        match self.tags.get(&tag) {
            Some(TagValue::Str(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    fn ints(&self, tag: u32) -> Vec<u64> {
        match self.tags.get(&tag) {
            Some(TagValue::Int(values)) => values.clone(),
            _ => Vec::new(),
        }
    }

    fn has(&self, tag: u32) -> bool {
        self.tags.contains_key(&tag)
    }
}

fn parse_rpm<R: Read>(reader: &mut R) -> Result<PackageHeader, String> {
    let mut lead = [0u8; LEAD_SIZE];
    reader
        .read_exact(&mut lead)
        .map_err(|e| format!("short lead: {e}"))?;
    if lead[..4] != LEAD_MAGIC {
        return Err("not an RPM file (bad lead magic)".to_string());
    }

    // Signature header is padded to an 8-byte boundary
    let sig_len = skip_header_section(reader)?;
    let pad = (8 - sig_len % 8) % 8;
    let mut skip = vec![0u8; pad];
    reader
        .read_exact(&mut skip)
        .map_err(|e| format!("truncated signature padding: {e}"))?;

    let header = read_header(reader)?;

    let name = header
        .string(TAG_NAME)
        .ok_or_else(|| "header has no name".to_string())?;
    let version = header
        .string(TAG_VERSION)
        .ok_or_else(|| "header has no version".to_string())?;
    let release = header
        .string(TAG_RELEASE)
        .ok_or_else(|| "header has no release".to_string())?;
    let epoch = header.ints(TAG_EPOCH).first().map(|e| e.to_string());
    let sourcerpm = header.string(TAG_SOURCERPM).filter(|s| !s.is_empty());
    let arch = if sourcerpm.is_none() {
        if header.has(TAG_NOSOURCE) || header.has(TAG_NOPATCH) {
            "nosrc".to_string()
        } else {
            "src".to_string()
        }
    } else {
        header.string(TAG_ARCH).unwrap_or_default()
    };

    let provide_names = header.strings(TAG_PROVIDENAME);
    let provide_flags = header.ints(TAG_PROVIDEFLAGS);
    let provide_versions = header.strings(TAG_PROVIDEVERSION);
    let provides = provide_names
        .iter()
        .enumerate()
        .map(|(i, pname)| {
            let flags = provide_flags.get(i).copied().unwrap_or(0) as u32;
            let version = provide_versions.get(i).map(String::as_str).unwrap_or("");
            format_dependency(pname, flags, version)
        })
        .collect();

    Ok(PackageHeader {
        name,
        epoch,
        version,
        release,
        arch,
        sourcerpm,
        license: header.string(TAG_LICENSE),
        buildtime: header.ints(TAG_BUILDTIME).first().copied(),
        disturl: header.string(TAG_DISTURL),
        provides,
    })
}

fn format_dependency(name: &str, flags: u32, version: &str) -> String {
    let mut op = String::new();
    if flags & SENSE_LESS != 0 {
        op.push('<');
    }
    if flags & SENSE_GREATER != 0 {
        op.push('>');
    }
    if flags & SENSE_EQUAL != 0 {
        op.push('=');
    }
    if op.is_empty() || version.is_empty() {
        name.to_string()
    } else {
        format!("{name} {op} {version}")
    }
}

/// Consume a header section without decoding it. Returns the bytes consumed.
fn skip_header_section<R: Read>(reader: &mut R) -> Result<usize, String> {
    let (index_count, store_len) = read_intro(reader)?;
    let body_len = index_count * 16 + store_len;
    let mut body = vec![0u8; body_len];
    reader
        .read_exact(&mut body)
        .map_err(|e| format!("truncated signature header: {e}"))?;
    Ok(16 + body_len)
}

fn read_intro<R: Read>(reader: &mut R) -> Result<(usize, usize), String> {
    let mut intro = [0u8; 16];
    reader
        .read_exact(&mut intro)
        .map_err(|e| format!("truncated header intro: {e}"))?;
    if intro[..3] != HEADER_MAGIC {
        return Err("bad header magic".to_string());
    }
    let index_count = be_u32(&intro[8..12]) as usize;
    let store_len = be_u32(&intro[12..16]) as usize;
    if index_count * 16 + store_len > MAX_HEADER_BYTES {
        return Err(format!(
            "header too large ({index_count} entries, {store_len} bytes)"
        ));
    }
    Ok((index_count, store_len))
}

fn read_header<R: Read>(reader: &mut R) -> Result<Header, String> {
    let (index_count, store_len) = read_intro(reader)?;
    let mut index = vec![0u8; index_count * 16];
    reader
        .read_exact(&mut index)
        .map_err(|e| format!("truncated header index: {e}"))?;
    let mut store = vec![0u8; store_len];
    reader
        .read_exact(&mut store)
        .map_err(|e| format!("truncated header store: {e}"))?;

    let mut tags = HashMap::new();
    for entry in index.chunks_exact(16) {
        let tag = be_u32(&entry[0..4]);
        let kind = be_u32(&entry[4..8]);
        let offset = be_u32(&entry[8..12]) as usize;
        let count = be_u32(&entry[12..16]) as usize;
        let value = decode_value(&store, kind, offset, count)
            .ok_or_else(|| format!("tag {tag} points outside the header store"))?;
        tags.insert(tag, value);
    }
    Ok(Header { tags })
}

fn decode_value(store: &[u8], kind: u32, offset: usize, count: usize) -> Option<TagValue> {
    match kind {
        // INT8, INT16, INT32, INT64
        2..=5 => {
            let width = match kind {
                2 => 1,
                3 => 2,
                4 => 4,
                _ => 8,
            };
            let bytes = store.get(offset..offset.checked_add(width * count)?)?;
            let values = bytes
                .chunks_exact(width)
                .map(|chunk| chunk.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
                .collect();
            Some(TagValue::Int(values))
        }
        // STRING, STRING_ARRAY, I18NSTRING
        6 | 8 | 9 => {
            let count = if kind == 6 { 1 } else { count };
            let mut values = Vec::with_capacity(count);
            let mut pos = offset;
            for _ in 0..count {
                let rest = store.get(pos..)?;
                let len = rest.iter().position(|&b| b == 0)?;
                values.push(String::from_utf8_lossy(&rest[..len]).to_string());
                pos += len + 1;
            }
            Some(TagValue::Str(values))
        }
        _ => Some(TagValue::Other),
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodcomp_test_utils::{RpmFixture, SENSE_EQUAL as FIXTURE_EQUAL};
    use tempfile::TempDir;

    #[test]
    fn read_binary_header() {
        let tmp = TempDir::new().unwrap();
        let fixture = RpmFixture::binary("bash", "5.2.37", "20.1", "x86_64")
            .with_license("GPL-3.0-or-later")
            .with_buildtime(1_735_000_000);
        let path = fixture.write_to(tmp.path()).unwrap();

        let header = RpmHeaderReader.read_header(&path).unwrap();
        assert_eq!(header.name, "bash");
        assert_eq!(header.version, "5.2.37");
        assert_eq!(header.release, "20.1");
        assert_eq!(header.arch, "x86_64");
        assert_eq!(header.epoch, None);
        assert_eq!(header.sourcerpm.as_deref(), Some("bash-5.2.37-20.1.src.rpm"));
        assert_eq!(header.license.as_deref(), Some("GPL-3.0-or-later"));
        assert_eq!(header.buildtime, Some(1_735_000_000));
        assert_eq!(header.provides, vec!["bash = 5.2.37-20.1".to_string()]);
    }

    #[test]
    fn read_epoch_and_provides() {
        let tmp = TempDir::new().unwrap();
        let fixture = RpmFixture::binary("vim", "9.1", "1.1", "aarch64")
            .with_epoch(2)
            .with_provide("/usr/bin/vi", 0, "")
            .with_provide("vi", FIXTURE_EQUAL, "9.1");
        let path = fixture.write_to(tmp.path()).unwrap();

        let header = RpmHeaderReader.read_header(&path).unwrap();
        assert_eq!(header.epoch.as_deref(), Some("2"));
        assert!(header.provides.contains(&"/usr/bin/vi".to_string()));
        assert!(header.provides.contains(&"vi = 9.1".to_string()));
    }

    #[test]
    fn source_packages_get_src_arch() {
        let tmp = TempDir::new().unwrap();
        let src = RpmFixture::source("bash", "5.2.37", "20.1")
            .write_to(tmp.path())
            .unwrap();
        let nosrc = RpmFixture::source("firmware", "1", "1")
            .with_nosource()
            .write_to(tmp.path())
            .unwrap();

        assert_eq!(RpmHeaderReader.read_header(&src).unwrap().arch, "src");
        assert_eq!(RpmHeaderReader.read_header(&nosrc).unwrap().arch, "nosrc");
    }

    #[test]
    fn rejects_non_rpm() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bogus.rpm");
        std::fs::write(&path, b"definitely not an rpm").unwrap();
        let err = RpmHeaderReader.read_header(&path).unwrap_err();
        assert!(matches!(err, ComposeError::Header { .. }), "got: {err}");
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = RpmHeaderReader
            .read_header(Path::new("/nonexistent/dummy-2.3.x86_64.rpm"))
            .unwrap_err();
        assert!(matches!(err, ComposeError::Io(_)));
    }

    #[test]
    fn split_nevra_plain() {
        let n = split_nevra("zypper-1.14.89-1.1.x86_64.rpm").unwrap();
        assert_eq!(n.name, "zypper");
        assert_eq!(n.version, "1.14.89");
        assert_eq!(n.release, "1.1");
        assert_eq!(n.arch, "x86_64");
        assert_eq!(n.epoch, None);
    }

    #[test]
    fn split_nevra_dashed_name_and_epoch() {
        let n = split_nevra("patterns-base-apparmor-1:20241218-1.3.noarch").unwrap();
        assert_eq!(n.name, "patterns-base-apparmor");
        assert_eq!(n.epoch.as_deref(), Some("1"));
        assert_eq!(n.version, "20241218");
        assert_eq!(n.arch, "noarch");
    }

    #[test]
    fn split_nevra_rejects_garbage() {
        assert!(split_nevra("README").is_none());
        assert!(split_nevra("foo.rpm").is_none());
    }

    #[test]
    fn filename_source_reads_nevra() {
        let header = FilenameNevra
            .read_header(Path::new("repo/glow-1.5.1-lp156.2.3.1.s390x.rpm"))
            .unwrap();
        assert_eq!(header.name, "glow");
        assert_eq!(header.release, "lp156.2.3.1");
        assert_eq!(header.arch, "s390x");
        assert!(header.sourcerpm.is_none());
    }
}
