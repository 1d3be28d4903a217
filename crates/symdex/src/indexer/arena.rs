use crate::indexer::frontend::ContainerHandle;
use crate::refs::DocRef;

/// A scope materialized during one file's pass, before its own document
/// necessarily had a final id at the time children were announced.
#[derive(Debug, Clone)]
pub(crate) struct ContainerInfo {
    pub doc_ref: DocRef,
    pub name: String,
    pub qualified_name: String,
}

/// Append-only arena backing the opaque container handles handed to the
/// front-end. Handles are slot indices, so they stay valid however much the
/// arena grows; the whole arena (and with it every issued handle) dies when
/// the file's pass completes.
#[derive(Debug, Default)]
pub(crate) struct ContainerArena {
    entries: Vec<ContainerInfo>,
}

impl ContainerArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, info: ContainerInfo) -> ContainerHandle {
        let handle = ContainerHandle(self.entries.len() as u32);
        self.entries.push(info);
        handle
    }

    pub fn get(&self, handle: ContainerHandle) -> Option<&ContainerInfo> {
        self.entries.get(handle.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_stay_valid_across_growth() {
        let mut arena = ContainerArena::new();
        let root = arena.push(ContainerInfo {
            doc_ref: DocRef::INVALID,
            name: String::new(),
            qualified_name: String::new(),
        });
        let mut handles = vec![root];
        for i in 0..1000 {
            handles.push(arena.push(ContainerInfo {
                doc_ref: DocRef::new(1, i + 1),
                name: format!("n{}", i),
                qualified_name: format!("n{}", i),
            }));
        }
        assert_eq!(arena.get(root).unwrap().name, "");
        assert_eq!(arena.get(handles[500]).unwrap().name, "n499");
        assert_eq!(arena.len(), 1001);
    }
}
