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

//! Interfaces of the external collaborators: the cloud document repository and the intrinsic
//! function library.
//!
//! The machine assumes every call is synchronous from its perspective; concurrency, transport
//! and credential validation are the collaborator's own concern.

use std::collections::{BTreeMap, VecDeque};

use amplify::Bytes32;
use sha2::{Digest, Sha256};

use crate::data::{Citation, DocDigest, Tag, Value, Version};

/// Errors reported by the cloud document repository.
#[derive(Clone, Eq, PartialEq, Debug, Display, Error)]
#[display(doc_comments)]
pub enum RepoError {
    /// document matching citation {0} is not present in the repository
    NotFound(Citation),

    /// draft {0}@{1} is not present in the repository
    DraftNotFound(Tag, Version),

    /// repository infrastructure failure: {0}
    Connectivity(String),
}

/// Cloud document repository interface consumed by the machine.
///
/// Queues are named by tags and hold FIFO sequences of messages; events are published without
/// addressing and routed by the cloud infrastructure.
pub trait Repository {
    /// Performs a content-addressed read of a committed document.
    fn retrieve_document(&mut self, citation: &Citation) -> Result<Value, RepoError>;

    /// Reads a draft by its tag and version.
    fn retrieve_draft(&mut self, tag: Tag, version: &Version) -> Result<Value, RepoError>;

    /// Commits a document, returning the citation of the committed content.
    fn commit_document(
        &mut self,
        tag: Tag,
        version: &Version,
        document: &Value,
    ) -> Result<Citation, RepoError>;

    /// Saves a document as a draft, overwriting a previous draft under the same tag and version.
    fn save_draft(&mut self, tag: Tag, version: &Version, document: &Value)
        -> Result<(), RepoError>;

    /// Removes and returns the oldest message of a queue; `None` when the queue is empty.
    ///
    /// The call never blocks; a task waiting for a message is checkpointed instead.
    fn receive_message(&mut self, queue: Tag) -> Result<Option<Value>, RepoError>;

    /// Appends a message to a queue.
    fn queue_message(&mut self, queue: Tag, message: &Value) -> Result<(), RepoError>;

    /// Publishes an event.
    fn publish_event(&mut self, event: &Value) -> Result<(), RepoError>;
}

/// Intrinsic function library interface.
///
/// Intrinsics are indexed 1-based, matching the 1-based INVOKE operand.
pub trait IntrinsicTable {
    /// Calls the indexed intrinsic with the collected argument list.
    ///
    /// An `Err` value is the exception raised by the intrinsic, propagated into the machine's
    /// exception-unwinding mechanism as-is.
    fn invoke(&mut self, index: u16, args: Vec<Value>) -> Result<Value, Value>;
}

/// An empty intrinsic library: every invocation raises an exception.
#[derive(Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Debug, Default)]
pub struct NoIntrinsics;

impl IntrinsicTable for NoIntrinsics {
    fn invoke(&mut self, _index: u16, _args: Vec<Value>) -> Result<Value, Value> {
        Err(Value::symbol("unknownIntrinsic"))
    }
}

/// Returns the well-known tag of the queue where waiting tasks are parked until a message
/// arrives for them.
pub fn wait_queue() -> Tag {
    Tag::from(Bytes32::from_byte_array(Sha256::digest(b"bali:nebula:task-wait-queue")))
}

/// Transient in-memory repository.
///
/// Backs the integration scenarios and examples; production deployments talk to the cloud
/// repository service instead. Published events are recorded in arrival order and can be
/// inspected by tests.
#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct MemRepository {
    documents: BTreeMap<(Tag, Version), Value>,
    drafts: BTreeMap<(Tag, Version), Value>,
    queues: BTreeMap<Tag, VecDeque<Value>>,
    events: Vec<Value>,
}

impl MemRepository {
    /// Constructs an empty repository.
    pub fn new() -> Self { MemRepository::default() }

    /// Returns events published so far, in arrival order.
    pub fn events(&self) -> &[Value] { &self.events }

    /// Returns the current content of a queue, oldest message first.
    pub fn queue(&self, queue: Tag) -> Vec<Value> {
        self.queues
            .get(&queue)
            .map(|messages| messages.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Repository for MemRepository {
    fn retrieve_document(&mut self, citation: &Citation) -> Result<Value, RepoError> {
        let document = self
            .documents
            .get(&(citation.tag, citation.version.clone()))
            .ok_or_else(|| RepoError::NotFound(citation.clone()))?;
        // committed content must still match the cited digest
        let digest = DocDigest::of(document.to_string());
        if citation.digest != Some(digest) {
            return Err(RepoError::NotFound(citation.clone()));
        }
        Ok(document.clone())
    }

    fn retrieve_draft(&mut self, tag: Tag, version: &Version) -> Result<Value, RepoError> {
        self.drafts
            .get(&(tag, version.clone()))
            .cloned()
            .ok_or_else(|| RepoError::DraftNotFound(tag, version.clone()))
    }

    fn commit_document(
        &mut self,
        tag: Tag,
        version: &Version,
        document: &Value,
    ) -> Result<Citation, RepoError> {
        self.documents.insert((tag, version.clone()), document.clone());
        self.drafts.remove(&(tag, version.clone()));
        let digest = DocDigest::of(document.to_string());
        Ok(Citation::new(tag, version.clone(), digest))
    }

    fn save_draft(
        &mut self,
        tag: Tag,
        version: &Version,
        document: &Value,
    ) -> Result<(), RepoError> {
        self.drafts.insert((tag, version.clone()), document.clone());
        Ok(())
    }

    fn receive_message(&mut self, queue: Tag) -> Result<Option<Value>, RepoError> {
        Ok(self.queues.entry(queue).or_default().pop_front())
    }

    fn queue_message(&mut self, queue: Tag, message: &Value) -> Result<(), RepoError> {
        self.queues.entry(queue).or_default().push_back(message.clone());
        Ok(())
    }

    fn publish_event(&mut self, event: &Value) -> Result<(), RepoError> {
        self.events.push(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tag() -> Tag { Tag::from([0x10; 32]) }

    #[test]
    fn committed_documents_are_content_addressed() {
        let mut repo = MemRepository::new();
        let doc = Value::catalog([(crate::data::Symbol::from("answer"), Value::number(42.0))]);
        let citation = repo.commit_document(tag(), &Version::default(), &doc).unwrap();
        assert!(!citation.is_draft());
        assert_eq!(repo.retrieve_document(&citation).unwrap(), doc);

        // a citation with a wrong digest does not resolve
        let wrong = Citation::new(tag(), Version::default(), DocDigest::of(b"other"));
        assert!(repo.retrieve_document(&wrong).is_err());
    }

    #[test]
    fn drafts() {
        let mut repo = MemRepository::new();
        let doc = Value::text("draft content");
        repo.save_draft(tag(), &Version::default(), &doc).unwrap();
        assert_eq!(repo.retrieve_draft(tag(), &Version::default()).unwrap(), doc);
        assert!(repo.retrieve_draft(tag(), &Version::new(2)).is_err());

        // committing supersedes the draft
        repo.commit_document(tag(), &Version::default(), &doc).unwrap();
        assert!(repo.retrieve_draft(tag(), &Version::default()).is_err());
    }

    #[test]
    fn queues_are_fifo() {
        let mut repo = MemRepository::new();
        assert_eq!(repo.receive_message(tag()).unwrap(), None);
        repo.queue_message(tag(), &Value::number(1.0)).unwrap();
        repo.queue_message(tag(), &Value::number(2.0)).unwrap();
        assert_eq!(repo.receive_message(tag()).unwrap(), Some(Value::number(1.0)));
        assert_eq!(repo.receive_message(tag()).unwrap(), Some(Value::number(2.0)));
        assert_eq!(repo.receive_message(tag()).unwrap(), None);
    }

    #[test]
    fn events_are_recorded() {
        let mut repo = MemRepository::new();
        repo.publish_event(&Value::symbol("completion")).unwrap();
        assert_eq!(repo.events(), &[Value::symbol("completion")]);
    }

    #[test]
    fn no_intrinsics() {
        assert_eq!(
            NoIntrinsics.invoke(1, vec![]),
            Err(Value::symbol("unknownIntrinsic"))
        );
    }
}
