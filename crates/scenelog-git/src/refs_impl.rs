//! gix-backed ref, HEAD, and rev-parse operations.

use gix::refs::transaction::{Change, LogChange, PreviousValue, RefLog};
use gix::refs::{FullName, Target};

use crate::error::GitError;
use crate::gix_repo::{GixRepo, from_gix_oid, to_gix_oid};
use crate::types::{GitOid, RefEdit, RefName};

fn full_name(name: &str) -> Result<FullName, GitError> {
    name.try_into()
        .map_err(|e: gix::validate::reference::name::Error| GitError::backend(e))
}

pub fn read_ref(repo: &GixRepo, name: &RefName) -> Result<Option<GitOid>, GitError> {
    match repo.repo.try_find_reference(name.as_str()) {
        Ok(Some(mut r)) => {
            let id = r.peel_to_id_in_place().map_err(GitError::backend)?;
            Ok(Some(from_gix_oid(id.as_ref())))
        }
        Ok(None) => Ok(None),
        Err(e) => Err(GitError::backend(e)),
    }
}

pub fn atomic_ref_update(repo: &GixRepo, edits: &[RefEdit]) -> Result<(), GitError> {
    let gix_edits: Vec<gix::refs::transaction::RefEdit> = edits
        .iter()
        .map(|edit| {
            let name = full_name(edit.name.as_str())?;
            let expected = if edit.expected_old_oid.is_zero() {
                PreviousValue::MustNotExist
            } else {
                PreviousValue::MustExistAndMatch(Target::Object(to_gix_oid(
                    edit.expected_old_oid,
                )))
            };

            Ok(gix::refs::transaction::RefEdit {
                change: Change::Update {
                    log: LogChange {
                        mode: RefLog::AndReference,
                        force_create_reflog: false,
                        message: "atomic ref update".into(),
                    },
                    expected,
                    new: Target::Object(to_gix_oid(edit.new_oid)),
                },
                name,
                deref: false,
            })
        })
        .collect::<Result<Vec<_>, GitError>>()?;

    if let Err(e) = repo.repo.edit_references(gix_edits) {
        // Classify by re-reading the refs rather than parsing the message: if
        // any ref no longer holds its expected value this was a CAS failure.
        for edit in edits {
            let current = read_ref(repo, &edit.name)?.unwrap_or(GitOid::ZERO);
            if current != edit.expected_old_oid {
                return Err(GitError::RefConflict {
                    ref_name: edit.name.as_str().to_owned(),
                    message: e.to_string(),
                });
            }
        }
        return Err(GitError::backend(e));
    }
    Ok(())
}

pub fn list_refs(repo: &GixRepo, prefix: &str) -> Result<Vec<(RefName, GitOid)>, GitError> {
    let platform = repo.repo.references().map_err(GitError::backend)?;
    let refs_iter = platform.prefixed(prefix).map_err(GitError::backend)?;

    let mut result = Vec::new();
    for r in refs_iter {
        let mut r = r.map_err(GitError::backend)?;
        let name_str = r.name().as_bstr().to_string();
        let id = r.peel_to_id_in_place().map_err(GitError::backend)?;
        if let Ok(ref_name) = RefName::new(&name_str) {
            result.push((ref_name, from_gix_oid(id.as_ref())));
        }
    }
    Ok(result)
}

pub fn head_target(repo: &GixRepo) -> Result<Option<RefName>, GitError> {
    let name = repo.repo.head_name().map_err(GitError::backend)?;
    name.map(|n| {
        RefName::new(&n.as_bstr().to_string()).map_err(|e| GitError::BackendError {
            message: e.to_string(),
        })
    })
    .transpose()
}

pub fn set_head(repo: &GixRepo, target: &RefName) -> Result<(), GitError> {
    let edit = gix::refs::transaction::RefEdit {
        change: Change::Update {
            log: LogChange {
                mode: RefLog::AndReference,
                force_create_reflog: false,
                message: format!("checkout: moving to {target}").into(),
            },
            expected: PreviousValue::Any,
            new: Target::Symbolic(full_name(target.as_str())?),
        },
        name: full_name("HEAD")?,
        deref: false,
    };
    repo.repo.edit_reference(edit).map_err(GitError::backend)?;
    tracing::debug!(%target, "HEAD repointed");
    Ok(())
}

pub fn rev_parse_opt(repo: &GixRepo, spec: &str) -> Result<Option<GitOid>, GitError> {
    // gix rev_parse errors are all resolution failures (malformed specs,
    // missing refs, ambiguous prefixes, unborn HEAD) and map to None.
    Ok(repo
        .repo
        .rev_parse_single(spec)
        .ok()
        .map(|id| from_gix_oid(id.as_ref())))
}
