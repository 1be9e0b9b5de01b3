// Reference rust implementation of the Bali virtual machine (BVM).
//
// SPDX-License-Identifier: Apache-2.0
//
// Written in 2021-2025 by
//     Dr Maxim Orlovsky <orlovsky@ubideco.org>
//
// Copyright (C) 2021-2025 UBIDECO Labs,
//     Laboratories for Distributed and Cognitive Computing, Switzerland.
//     All rights reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use core::fmt::{self, Display, Formatter};
use core::str::FromStr;

use amplify::hex::{self, FromHex};
use amplify::Bytes32;
use baid64::{Baid64ParseError, DisplayBaid64, FromBaid64Str};
use sha2::{Digest, Sha256};

/// Opaque identity used for tasks, accounts, documents and message queues.
///
/// Tags are never derived from content; they are assigned once, when the entity they identify is
/// created, and stay stable across versions.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, Debug, From)]
#[wrapper(Deref, BorrowSlice, Hex, Index, RangeOps)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Tag(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl Display for Tag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { write!(f, "#{:X}", self.0) }
}

impl FromStr for Tag {
    type Err = hex::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix('#').unwrap_or(s);
        Bytes32::from_hex(&s.to_lowercase()).map(Self)
    }
}

/// Document version in dotted notation (`v1.2.3`).
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct Version(Vec<u32>);

impl Default for Version {
    fn default() -> Self { Version(vec![1]) }
}

impl Version {
    /// Constructs a single-component version (`v1`, `v2`, ...).
    pub fn new(major: u32) -> Self { Version(vec![major]) }

    /// Constructs a version from dotted components. An empty iterator yields `v1`.
    pub fn with(parts: impl IntoIterator<Item = u32>) -> Self {
        let parts = parts.into_iter().collect::<Vec<_>>();
        if parts.is_empty() {
            return Version::default();
        }
        Version(parts)
    }

    /// Returns the dotted version components.
    pub fn parts(&self) -> &[u32] { &self.0 }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "v{}",
            self.0
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(".")
        )
    }
}

/// Error parsing a document version literal.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Display, Error)]
#[display("invalid version literal \"{0}\"; versions must use the dotted v1.2.3 form")]
pub struct VersionError(pub String);

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let numbers = s
            .strip_prefix('v')
            .ok_or_else(|| VersionError(s.to_owned()))?;
        let parts = numbers
            .split('.')
            .map(u32::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| VersionError(s.to_owned()))?;
        if parts.is_empty() {
            return Err(VersionError(s.to_owned()));
        }
        Ok(Version(parts))
    }
}

/// Content digest of a document, representing a commitment to its source notation form.
///
/// Any two distinct documents are guaranteed (with SHA256 collision resistance level) to have
/// distinct digests.
#[derive(Wrapper, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Default, Debug, From)]
#[wrapper(Deref, BorrowSlice, Hex, Index, RangeOps)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(transparent))]
pub struct DocDigest(
    #[from]
    #[from([u8; 32])]
    Bytes32,
);

impl DocDigest {
    /// Computes the content digest of a document rendered into its source notation.
    pub fn of(source: impl AsRef<[u8]>) -> Self {
        let hash = Sha256::digest(source.as_ref());
        Self(Bytes32::from_byte_array(hash))
    }
}

impl DisplayBaid64 for DocDigest {
    const HRI: &'static str = "doc";
    const CHUNKING: bool = true;
    const PREFIX: bool = true;
    const EMBED_CHECKSUM: bool = false;
    const MNEMONIC: bool = false;
    fn to_baid64_payload(&self) -> [u8; 32] { self.to_byte_array() }
}
impl FromBaid64Str for DocDigest {}
impl FromStr for DocDigest {
    type Err = Baid64ParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::from_baid64_str(s) }
}
impl Display for DocDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result { self.fmt_baid64(f) }
}

impl From<Sha256> for DocDigest {
    fn from(hash: Sha256) -> Self { Self(Bytes32::from_byte_array(hash.finalize())) }
}

/// Textual citation of a document persisted in the cloud repository.
///
/// A citation without a content digest refers to a draft, retrievable by tag and version only;
/// a citation carrying a digest refers to committed, immutable content.
#[derive(Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize), serde(rename_all = "camelCase"))]
pub struct Citation {
    pub tag: Tag,
    pub version: Version,
    pub digest: Option<DocDigest>,
}

impl Citation {
    /// Constructs a citation of committed document content.
    pub fn new(tag: Tag, version: Version, digest: DocDigest) -> Self {
        Citation {
            tag,
            version,
            digest: Some(digest),
        }
    }

    /// Constructs a citation of a draft, which carries no content digest.
    pub fn draft(tag: Tag, version: Version) -> Self {
        Citation {
            tag,
            version,
            digest: None,
        }
    }

    /// Detects whether the citation refers to a draft.
    #[inline]
    pub fn is_draft(&self) -> bool { self.digest.is_none() }
}

impl Display for Citation {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "<{}/{}/", self.tag, self.version)?;
        match &self.digest {
            Some(digest) => Display::fmt(digest, f)?,
            None => f.write_str("none")?,
        }
        f.write_str(">")
    }
}

/// Error parsing [`Citation`] textual representation
#[derive(Clone, Eq, PartialEq, Debug, Display, Error, From)]
#[display(doc_comments)]
pub enum CitationError {
    /// citation must be delimited with `<` and `>`
    Delimiters,

    /// citation "{0}" must consist of a tag, a version and a digest separated with `/`
    Structure(String),

    /// invalid document tag in citation: {0}
    #[from]
    Tag(hex::Error),

    /// invalid document version in citation: {0}
    #[from]
    Version(VersionError),

    /// invalid content digest in citation: {0}
    #[from]
    Digest(Baid64ParseError),
}

impl FromStr for Citation {
    type Err = CitationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .ok_or(CitationError::Delimiters)?;
        let mut parts = inner.splitn(3, '/');
        let (tag, version, digest) = match (parts.next(), parts.next(), parts.next()) {
            (Some(tag), Some(version), Some(digest)) => (tag, version, digest),
            _ => return Err(CitationError::Structure(inner.to_owned())),
        };
        let tag = Tag::from_str(tag)?;
        let version = Version::from_str(version)?;
        let digest = match digest {
            "none" => None,
            digest => Some(DocDigest::from_str(digest)?),
        };
        Ok(Citation {
            tag,
            version,
            digest,
        })
    }
}
