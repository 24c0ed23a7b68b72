use std::path::{Path, PathBuf};

/// Resolves relative paths in a test plan against the plan's directory.
#[derive(Clone)]
pub struct PathResolver {
    base_dir: PathBuf,
}

impl PathResolver {
    pub fn new(plan_path: &Path) -> Self {
        let base_dir = plan_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self { base_dir }
    }

    pub fn resolve_str(&self, s: &mut String) {
        if s.trim().is_empty() {
            return;
        }
        let pb = PathBuf::from(&*s);
        if pb.is_absolute() {
            return;
        }

        let joined = self.join_clean(&pb);
        *s = joined.to_string_lossy().to_string();
    }

    fn join_clean(&self, rel: &Path) -> PathBuf {
        let joined = self.base_dir.join(rel);

        let mut out = PathBuf::new();
        for c in joined.components() {
            use std::path::Component::*;
            match c {
                CurDir => {}
                ParentDir => {
                    let last = out.components().next_back();
                    let at_normal = matches!(last, Some(Normal(_)));
                    // `..` above the root stays at the root
                    let at_root = matches!(last, Some(RootDir) | Some(Prefix(_)));
                    if at_normal {
                        out.pop();
                    } else if !at_root {
                        out.push("..");
                    }
                }
                RootDir | Prefix(_) | Normal(_) => out.push(c.as_os_str()),
            }
        }
        out
    }
}
