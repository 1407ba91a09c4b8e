//! # Answer Cache
//!
//! In-process memo of every answer computed since startup or the last `/invalidateCache`.
//!
//! - Two levels: question kind, then the question's parameter value
//! - Partitions are created lazily on first `put`
//! - No expiry and no size bound, memory grows with distinct questions asked
//! - Concurrent misses for one key may both query, last writer wins
use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use crate::{database::Row, questions::QuestionKind};

#[derive(Debug, Clone, PartialEq)]
pub enum Answer {
    Count(u64),
    Rows(Arc<Vec<Row>>),
}

#[derive(Default)]
pub struct AnswerCache {
    partitions: RwLock<HashMap<QuestionKind, HashMap<String, Answer>>>,
}

impl AnswerCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: QuestionKind, param: &str) -> Option<Answer> {
        self.partitions
            .read()
            .get(&kind)
            .and_then(|partition| partition.get(param))
            .cloned()
    }

    pub fn put(&self, kind: QuestionKind, param: &str, answer: Answer) {
        self.partitions
            .write()
            .entry(kind)
            .or_default()
            .insert(param.to_string(), answer);
    }

    pub fn invalidate_all(&self) {
        self.partitions.write().clear();
    }

    pub fn len(&self) -> usize {
        self.partitions.read().values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
