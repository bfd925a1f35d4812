use std::path::{Path, PathBuf};

/// Everything before the final `-` in an identity string is its role; an
/// identity with no `-` is its own role (`spawn/constitute.py::_extract_role`).
pub fn extract_role(identity: &str) -> String {
    match identity.rfind('-') {
        Some(pos) => identity[..pos].to_string(),
        None => identity.to_string(),
    }
}

/// Assemble a full constitution document for `identity` from the base
/// constitution text, the shared canon corpus, and a fixed header/footer
/// (`spawn/spawn.py::inject_identity`).
///
/// Layout: `"# {ROLE} CONSTITUTION"` header, a one-line self-description,
/// then every `*.md` file under `canon_dir` concatenated in sorted path
/// order, then `base_constitution_content`, then a fixed orientation
/// footer.
pub fn inject_identity(
    base_constitution_content: &str,
    role: &str,
    identity: &str,
    model: Option<&str>,
    canon_dir: &Path,
) -> std::io::Result<String> {
    let header = format!("# {} CONSTITUTION", role.to_uppercase());
    let self_desc = match model {
        Some(model) => format!("Self: You are {identity}. Your model is {model}."),
        None => format!("Self: You are {identity}."),
    };
    let canon_content = collect_canon(canon_dir)?;
    let footer = format!(
        "run `space` for orientation (already in PATH).\nrun: `memory --as {identity}` to access memories."
    );

    Ok(format!(
        "{header}\n{self_desc}\n\n{canon_content}{base_constitution_content}\n{footer}"
    ))
}

fn collect_canon(canon_dir: &Path) -> std::io::Result<String> {
    if !canon_dir.is_dir() {
        return Ok(String::new());
    }
    let mut files = Vec::new();
    collect_markdown_files(canon_dir, &mut files)?;
    files.sort();

    let mut out = String::new();
    for path in files {
        out.push_str(&std::fs::read_to_string(&path)?);
        out.push('\n');
    }
    Ok(out)
}

fn collect_markdown_files(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_markdown_files(&path, out)?;
        } else if path.extension().is_some_and(|ext| ext == "md") {
            out.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_role_splits_on_last_dash() {
        assert_eq!(extract_role("researcher-7"), "researcher");
        assert_eq!(extract_role("ops-lead-3"), "ops-lead");
        assert_eq!(extract_role("standalone"), "standalone");
    }

    #[test]
    fn inject_identity_assembles_header_self_desc_canon_and_footer() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.md"), "second\n").unwrap();
        std::fs::write(dir.path().join("a.md"), "first\n").unwrap();

        let doc = inject_identity(
            "BASE CONSTITUTION BODY",
            "researcher",
            "researcher-7",
            Some("opus"),
            dir.path(),
        )
        .unwrap();

        assert!(doc.starts_with("# RESEARCHER CONSTITUTION\n"));
        assert!(doc.contains("Self: You are researcher-7. Your model is opus."));
        let a_pos = doc.find("first").unwrap();
        let b_pos = doc.find("second").unwrap();
        assert!(a_pos < b_pos, "canon files must concatenate in sorted path order");
        assert!(doc.contains("BASE CONSTITUTION BODY"));
        assert!(doc.ends_with("run: `memory --as researcher-7` to access memories."));
    }

    #[test]
    fn inject_identity_without_model_omits_model_clause() {
        let dir = tempfile::tempdir().unwrap();
        let doc = inject_identity("BASE", "scout", "scout", None, dir.path()).unwrap();
        assert!(doc.contains("Self: You are scout.\n"));
        assert!(!doc.contains("Your model is"));
    }
}
