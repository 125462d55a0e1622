//! Breadth-first dependency closure and the (stubbed) relocation pass.

use crate::error::LoaderResult;
use crate::loader::module::{search_for_module_file, ModuleRegistry};
use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;

impl ModuleRegistry {
    /// Loads every transitive dependency of the module at registry index 0,
    /// via an explicit BFS queue and a visited-set keyed by dependency name.
    /// Terminates on any finite dependency graph, cyclic or not (invariant 8).
    pub fn load_all_dependencies(
        &mut self,
        search_dirs: &[PathBuf],
        keep_self_backing: bool,
    ) -> LoaderResult<()> {
        let mut queue: VecDeque<String> = self
            .get(0)
            .map(|root| root.dependencies.iter().cloned().collect())
            .unwrap_or_default();
        let mut visited: HashSet<String> = HashSet::new();

        while let Some(name) = queue.pop_front() {
            if !visited.insert(name.clone()) {
                continue;
            }

            let path = search_for_module_file(&name, search_dirs);
            let index = self.load_file(&path, keep_self_backing)?;

            if let Some(module) = self.get(index) {
                for dep in &module.dependencies {
                    if !visited.contains(dep) {
                        queue.push_back(dep.clone());
                    }
                }
            }
        }

        Ok(())
    }

    /// Applies RELA/JMPREL fix-ups against the published symbol table.
    ///
    /// Not implemented: the contract here is "no-op on success" until a
    /// relocation engine is built against the RELA/JMPREL tables already
    /// parsed and retained on each loaded module's source OELF.
    pub fn link_modules(&mut self) -> LoaderResult<()> {
        Ok(())
    }
}
