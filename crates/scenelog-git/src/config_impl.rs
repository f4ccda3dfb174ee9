//! gix-backed config read and write.
//!
//! Reads go through the repository's config snapshot, so values from the
//! global and system config are visible too. Writes load the
//! repository-local `config` file with gix-config, set the value and replace
//! the file through a `config.lock`, as git does.

use crate::error::GitError;
use crate::gix_repo::GixRepo;

pub fn read_config(repo: &GixRepo, key: &str) -> Result<Option<String>, GitError> {
    let snapshot = repo.repo.config_snapshot();
    Ok(snapshot.string(key).map(|v| v.to_string()))
}

pub fn write_config(repo: &GixRepo, key: &str, value: &str) -> Result<(), GitError> {
    let (section, name) = key.split_once('.').ok_or_else(|| GitError::BackendError {
        message: format!("config key `{key}` must have the form section.name"),
    })?;
    let path = repo.repo.git_dir().join("config");
    let mut file =
        gix::config::File::from_path_no_includes(path.clone(), gix::config::Source::Local)
            .map_err(GitError::backend)?;
    file.set_raw_value_by(section, None, name.to_owned(), value)
        .map_err(GitError::backend)?;

    let mut lock = gix::lock::File::acquire_to_update_resource(
        &path,
        gix::lock::acquire::Fail::Immediately,
        None,
    )
    .map_err(GitError::backend)?;
    file.write_to(&mut lock)?;
    lock.commit().map_err(|e| GitError::from(e.error))?;
    tracing::debug!(key, "config value written");
    Ok(())
}
