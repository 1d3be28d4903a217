use crate::refs;
use anyhow::{bail, Result};
use std::collections::HashMap;

/// Bidirectional filename⇄id table so documents store a small integer
/// instead of a repeated path. Ids are assigned in insertion order starting
/// at 1 (0 is never a valid file id) and entries are never removed within a
/// run.
#[derive(Debug, Clone, Default)]
pub struct HeaderFilesCache {
    by_name: HashMap<String, u32>,
    // id - 1 indexes into this list
    by_id: Vec<String>,
}

impl HeaderFilesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `name`, inserting it if unseen. Repeated lookups of
    /// the same filename return the same id.
    pub fn insert(&mut self, name: &str) -> u32 {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = self.by_id.len() as u32 + 1;
        self.by_id.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        id
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.by_name.get(name).copied()
    }

    pub fn name_of(&self, id: u32) -> Option<&str> {
        if id == 0 {
            return None;
        }
        self.by_id.get(id as usize - 1).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &str)> {
        self.by_id
            .iter()
            .enumerate()
            .map(|(i, s)| (i as u32 + 1, s.as_str()))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        refs::put_u32(&mut buf, self.by_id.len() as u32);
        for name in &self.by_id {
            refs::put_str(&mut buf, name);
        }
        buf
    }

    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let mut off = 0usize;
        let n = refs::get_u32(buf, &mut off)? as usize;
        let mut cache = Self::default();
        for _ in 0..n {
            let name = refs::get_str(buf, &mut off)?;
            cache.insert(&name);
        }
        if cache.len() != n {
            bail!("header cache blob contains duplicate entries");
        }
        Ok(cache)
    }
}
