//! Helpers for building package repository fixtures in tests.
//!
//! Functions here return `io::Result` instead of panicking so failures show up
//! at the call site.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

const LEAD_MAGIC: [u8; 4] = [0xed, 0xab, 0xee, 0xdb];
const HEADER_MAGIC: [u8; 8] = [0x8e, 0xad, 0xe8, 0x01, 0, 0, 0, 0];

const TYPE_INT32: u32 = 4;
const TYPE_STRING: u32 = 6;
const TYPE_STRING_ARRAY: u32 = 8;

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
const TAG_PROVIDEFLAGS: u32 = 1112;
const TAG_PROVIDEVERSION: u32 = 1113;
const TAG_DISTURL: u32 = 1123;

/// `RPMSENSE_EQUAL` flag for provides.
pub const SENSE_EQUAL: u32 = 8;

/// Description of one package file to write.
#[derive(Debug, Clone)]
pub struct RpmFixture {
    pub name: String,
    pub epoch: Option<u32>,
    pub version: String,
    pub release: String,
    pub arch: String,
    pub sourcerpm: Option<String>,
    pub license: String,
    pub buildtime: u32,
    pub disturl: Option<String>,
    pub nosource: bool,
    pub provides: Vec<(String, u32, String)>,
}

impl RpmFixture {
    /// A binary package whose source reference is `name-version-release.src.rpm`.
    pub fn binary(name: &str, version: &str, release: &str, arch: &str) -> Self {
        Self {
            name: name.to_string(),
            epoch: None,
            version: version.to_string(),
            release: release.to_string(),
            arch: arch.to_string(),
            sourcerpm: Some(format!("{name}-{version}-{release}.src.rpm")),
            license: "MIT".to_string(),
            buildtime: 1_700_000_000,
            disturl: None,
            nosource: false,
            provides: vec![(name.to_string(), SENSE_EQUAL, format!("{version}-{release}"))],
        }
    }

    /// A source package (no source reference; the header arch is ignored by readers).
    pub fn source(name: &str, version: &str, release: &str) -> Self {
        let mut fixture = Self::binary(name, version, release, "x86_64");
        fixture.sourcerpm = None;
        fixture
    }

    pub fn with_epoch(mut self, epoch: u32) -> Self {
        self.epoch = Some(epoch);
        self
    }

    pub fn with_sourcerpm(mut self, sourcerpm: &str) -> Self {
        self.sourcerpm = Some(sourcerpm.to_string());
        self
    }

    pub fn with_buildtime(mut self, buildtime: u32) -> Self {
        self.buildtime = buildtime;
        self
    }

    pub fn with_license(mut self, license: &str) -> Self {
        self.license = license.to_string();
        self
    }

    pub fn with_nosource(mut self) -> Self {
        self.nosource = true;
        self
    }

    pub fn with_provide(mut self, name: &str, flags: u32, version: &str) -> Self {
        self.provides
            .push((name.to_string(), flags, version.to_string()));
        self
    }

    /// File name the fixture is written under.
    pub fn file_name(&self) -> String {
        let arch = if self.sourcerpm.is_none() {
            if self.nosource {
                "nosrc"
            } else {
                "src"
            }
        } else {
            self.arch.as_str()
        };
        format!("{}-{}-{}.{arch}.rpm", self.name, self.version, self.release)
    }

    /// Encode lead, empty signature header and main header.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut header = HeaderWriter::default();
        header.string(TAG_NAME, &self.name);
        header.string(TAG_VERSION, &self.version);
        header.string(TAG_RELEASE, &self.release);
        if let Some(epoch) = self.epoch {
            header.int32(TAG_EPOCH, &[epoch]);
        }
        header.int32(TAG_BUILDTIME, &[self.buildtime]);
        header.string(TAG_LICENSE, &self.license);
        header.string(TAG_ARCH, &self.arch);
        if let Some(ref src) = self.sourcerpm {
            header.string(TAG_SOURCERPM, src);
        }
        if !self.provides.is_empty() {
            let names: Vec<&str> = self.provides.iter().map(|p| p.0.as_str()).collect();
            let flags: Vec<u32> = self.provides.iter().map(|p| p.1).collect();
            let versions: Vec<&str> = self.provides.iter().map(|p| p.2.as_str()).collect();
            header.string_array(TAG_PROVIDENAME, &names);
            header.int32(TAG_PROVIDEFLAGS, &flags);
            header.string_array(TAG_PROVIDEVERSION, &versions);
        }
        if self.nosource {
            header.int32(TAG_NOSOURCE, &[0]);
        }
        if let Some(ref url) = self.disturl {
            header.string(TAG_DISTURL, url);
        }

        let mut out = lead(&self.name, self.sourcerpm.is_none());
        out.extend(HeaderWriter::default().finish());
        out.extend(header.finish());
        out
    }

    /// Write the fixture into `dir` under its canonical file name.
    pub fn write_to(&self, dir: &Path) -> io::Result<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(self.file_name());
        std::fs::write(&path, self.to_bytes())?;
        Ok(path)
    }
}

fn lead(name: &str, is_source: bool) -> Vec<u8> {
    let mut lead = Vec::with_capacity(96);
    lead.extend_from_slice(&LEAD_MAGIC);
    lead.extend_from_slice(&[3, 0]);
    lead.extend_from_slice(&(u16::from(is_source)).to_be_bytes());
    lead.extend_from_slice(&1u16.to_be_bytes());
    let mut lead_name = [0u8; 66];
    for (slot, byte) in lead_name.iter_mut().zip(name.bytes().take(65)) {
        *slot = byte;
    }
    lead.extend_from_slice(&lead_name);
    lead.extend_from_slice(&1u16.to_be_bytes());
    lead.extend_from_slice(&5u16.to_be_bytes());
    lead.extend_from_slice(&[0u8; 16]);
    lead
}

#[derive(Default)]
struct HeaderWriter {
    index: Vec<[u32; 4]>,
    store: Vec<u8>,
}

impl HeaderWriter {
    fn string(&mut self, tag: u32, value: &str) {
        let offset = self.store.len() as u32;
        self.store.extend_from_slice(value.as_bytes());
        self.store.push(0);
        self.index.push([tag, TYPE_STRING, offset, 1]);
    }

    fn string_array(&mut self, tag: u32, values: &[&str]) {
        let offset = self.store.len() as u32;
        for value in values {
            self.store.extend_from_slice(value.as_bytes());
            self.store.push(0);
        }
        self.index
            .push([tag, TYPE_STRING_ARRAY, offset, values.len() as u32]);
    }

    fn int32(&mut self, tag: u32, values: &[u32]) {
        while self.store.len() % 4 != 0 {
            self.store.push(0);
        }
        let offset = self.store.len() as u32;
        for value in values {
            self.store.extend_from_slice(&value.to_be_bytes());
        }
        self.index.push([tag, TYPE_INT32, offset, values.len() as u32]);
    }

    /// Serialize, padded to an 8-byte boundary as required between headers.
    fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&HEADER_MAGIC);
        out.extend_from_slice(&(self.index.len() as u32).to_be_bytes());
        out.extend_from_slice(&(self.store.len() as u32).to_be_bytes());
        for entry in &self.index {
            for field in entry {
                out.extend_from_slice(&field.to_be_bytes());
            }
        }
        out.extend_from_slice(&self.store);
        while out.len() % 8 != 0 {
            out.push(0);
        }
        out
    }
}

/// A scratch repository directory populated with fixtures.
pub struct RepoTree {
    pub dir: TempDir,
}

impl RepoTree {
    pub fn new() -> io::Result<Self> {
        Ok(Self {
            dir: TempDir::new()?,
        })
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write `fixture` into `subdir` (relative to the tree root).
    pub fn add(&self, subdir: &str, fixture: &RpmFixture) -> io::Result<PathBuf> {
        fixture.write_to(&self.root().join(subdir))
    }

    /// Write an arbitrary file (update notices, manifests) relative to the root.
    pub fn write_file(&self, rel: &str, content: &str) -> io::Result<PathBuf> {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }
}
