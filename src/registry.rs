//! Formula registry - loads formula files and resolves names to descriptors.

use std::collections::BTreeMap;
use std::path::Path;

use walkdir::WalkDir;

use crate::descriptor::Formula;
use crate::error::InstallError;

/// All formulas found in a formulas directory, keyed by name.
#[derive(Debug, Default)]
pub struct Registry {
    formulas: BTreeMap<String, Formula>,
}

impl Registry {
    /// Load every `.toml` formula under `dir`, recursively.
    ///
    /// A file that fails to parse aborts the load; a half-read registry
    /// would silently hide formulas.
    pub fn load(dir: &Path) -> Result<Self, InstallError> {
        let mut formulas = BTreeMap::new();

        for entry in WalkDir::new(dir).into_iter().filter_map(Result::ok) {
            let path = entry.path();
            if !entry.file_type().is_file()
                || path.extension().and_then(|e| e.to_str()) != Some("toml")
            {
                continue;
            }

            let text = std::fs::read_to_string(path)?;
            let formula = Formula::parse(&text).map_err(|e| {
                InstallError::MalformedDescriptor(format!("{}: {}", path.display(), e))
            })?;
            formulas.insert(formula.name.clone(), formula);
        }

        Ok(Self { formulas })
    }

    /// Look up a formula by name.
    pub fn get(&self, name: &str) -> Option<&Formula> {
        self.formulas.get(name)
    }

    /// Iterate formulas in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Formula> {
        self.formulas.values()
    }

    pub fn is_empty(&self) -> bool {
        self.formulas.is_empty()
    }

    pub fn len(&self) -> usize {
        self.formulas.len()
    }
}
