//! Migration authoring: writes new, correctly named migration skeletons.
//!
//! Files land in `<root>/<lineage>/v<major>_<minor>_<patch>_<name>.rs`. Sorting
//! those names lexically only matches version order while every component is
//! a single digit, which is why the registry never relies on file order.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use minijinja::{Environment, context};

use crate::error::MigrationError;
use crate::version::{Lineage, Version};

const TEMPLATE_NAME: &str = "migration.rs";
const TEMPLATE: &str = include_str!("../templates/migration.rs.jinja");

/// A freshly written migration skeleton.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMigration {
    /// Where the file was written.
    pub path: PathBuf,
    /// The lineage it belongs to.
    pub lineage: Lineage,
    /// Its version.
    pub version: Version,
    /// The Rust module name, i.e. the file stem.
    pub module: String,
    /// The name of the generated migration struct.
    pub type_name: String,
}

impl NewMigration {
    /// Operator guidance printed after a successful creation.
    pub fn next_steps(&self) -> String {
        format!(
            "Next steps:\n  \
             1. Implement up and down in {path}\n  \
             2. Add `mod {module};` to the {lineage} migrations module and register \
             `Arc::new({module}::{type_name})` in its list\n  \
             3. Run `stratum status --lineage {lineage}` to see {version} pending",
            path = self.path.display(),
            module = self.module,
            lineage = self.lineage,
            type_name = self.type_name,
            version = self.version,
        )
    }
}

/// Generates migration source files below a root directory.
#[derive(Debug, Clone)]
pub struct MigrationAuthor {
    root: PathBuf,
}

impl MigrationAuthor {
    /// Creates an author writing below `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The directory holding the sources of a lineage.
    pub fn lineage_dir(&self, lineage: &Lineage) -> PathBuf {
        self.root.join(lineage.as_str())
    }

    /// Writes a new migration skeleton.
    ///
    /// Empty arguments are a [`MigrationError::Usage`], a malformed version a
    /// [`MigrationError::Format`], and an existing file for the same version in
    /// the lineage a [`MigrationError::Conflict`]. Nothing is written on error.
    pub fn create(
        &self,
        lineage: &Lineage,
        version: &str,
        name: &str,
        description: &str,
    ) -> Result<NewMigration, MigrationError> {
        for (argument, value) in [("version", version), ("name", name), ("description", description)]
        {
            if value.trim().is_empty() {
                return Err(MigrationError::Usage(format!("missing {argument}")));
            }
        }

        let version = Version::parse(version)?;
        let slug = to_snake_case(name);
        if slug.is_empty() {
            return Err(MigrationError::Usage(format!(
                "name '{name}' has no usable characters"
            )));
        }

        let dir = self.lineage_dir(lineage);
        if let Some(existing) = self.existing_file(&dir, &version)? {
            return Err(MigrationError::Conflict {
                lineage: lineage.clone(),
                version,
                reason: format!("{} already exists", existing.display()),
            });
        }

        let module = format!("{}_{}", version.file_stem(), slug);
        let type_name = to_type_name(&slug);
        let source = render(lineage, &version, &slug, description, &type_name)?;

        fs::create_dir_all(&dir).map_err(|source| MigrationError::Io {
            path: dir.clone(),
            source,
        })?;

        let path = dir.join(format!("{module}.rs"));
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(source.as_bytes())
            .map_err(|source| MigrationError::Io {
                path: path.clone(),
                source,
            })?;

        log::info!("Created migration {}@{} at {}", lineage, version, path.display());

        Ok(NewMigration {
            path,
            lineage: lineage.clone(),
            version,
            module,
            type_name,
        })
    }

    /// Finds a source file for `version` in a lineage directory.
    fn existing_file(&self, dir: &Path, version: &Version) -> Result<Option<PathBuf>, MigrationError> {
        if !dir.exists() {
            return Ok(None);
        }

        let prefix = format!("{}_", version.file_stem());
        let exact = format!("{}.rs", version.file_stem());
        let entries = fs::read_dir(dir).map_err(|source| MigrationError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        for entry in entries {
            let entry = entry.map_err(|source| MigrationError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let file_name = entry.file_name();
            let file_name = file_name.to_string_lossy();
            if file_name == exact || (file_name.starts_with(&prefix) && file_name.ends_with(".rs")) {
                return Ok(Some(entry.path()));
            }
        }

        Ok(None)
    }
}

fn render(
    lineage: &Lineage,
    version: &Version,
    slug: &str,
    description: &str,
    type_name: &str,
) -> Result<String, MigrationError> {
    let mut env = Environment::new();
    env.add_template(TEMPLATE_NAME, TEMPLATE)?;

    let summary = description.lines().next().unwrap_or_default().trim();
    let mut source = env.get_template(TEMPLATE_NAME)?.render(context! {
        lineage => lineage.as_str(),
        version => version.to_string(),
        summary => summary,
        // Debug formatting yields valid, escaped Rust string literals.
        version_literal => format!("{:?}", version.to_string()),
        name_literal => format!("{slug:?}"),
        description_literal => format!("{description:?}"),
        type_name => type_name,
    })?;
    source.push('\n');
    Ok(source)
}

/// `Add MFA flag` and `addMfaFlag` both become `add_mfa_flag`.
fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;

    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower_or_digit {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }

    out.trim_end_matches('_').to_string()
}

/// `add_mfa_flag` becomes `AddMfaFlag`. Identifiers can't start with a digit.
fn to_type_name(slug: &str) -> String {
    let mut out: String = slug
        .split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, "Migration");
    }
    out
}
