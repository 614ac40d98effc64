//! Filename and path containment checks
//!
//! Everything that reads or writes a path on behalf of the surface goes through
//! [`is_contained`]. All checks are lexical: the paths involved (upload targets,
//! link destinations) frequently do not exist yet, so nothing here touches the
//! filesystem.

use std::path::{Component, Path, PathBuf};

/// Character substituted for anything unsafe in a filename
pub const PLACEHOLDER: char = '_';

/// Directory used when the configured upload folder escapes the workspace
pub const FALLBACK_UPLOAD_DIR: &str = "assets";

/// Errors produced while validating a path coming from the surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    /// Filename was empty after sanitization
    EmptyName,
    /// Resolved path is outside the allowed root
    OutsideRoot { path: PathBuf, root: PathBuf },
    /// Document has no containing directory to resolve against
    NoParent(PathBuf),
}

impl PathError {
    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::EmptyName => "Rejected upload with an empty or invalid file name".to_string(),
            Self::OutsideRoot { path, .. } => {
                format!("Access outside the workspace is not allowed: {}", path.display())
            }
            Self::NoParent(path) => format!("Cannot resolve a directory for {}", path.display()),
        }
    }
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "empty file name"),
            Self::OutsideRoot { path, root } => write!(
                f,
                "{} is not contained in {}",
                path.display(),
                root.display()
            ),
            Self::NoParent(path) => write!(f, "{} has no parent directory", path.display()),
        }
    }
}

impl std::error::Error for PathError {}

/// Make a user-supplied filename safe to join onto a directory.
///
/// Leading dots are stripped, separators and `..` sequences become
/// [`PLACEHOLDER`], and so does any character outside `[A-Za-z0-9_.-]`.
/// An empty result means the name must be rejected.
pub fn sanitize_filename(name: &str) -> String {
    let trimmed = name.trim_start_matches('.');
    if trimmed.trim().is_empty() {
        return String::new();
    }

    let separators_replaced: String = trimmed
        .chars()
        .map(|c| if c == '/' || c == '\\' { PLACEHOLDER } else { c })
        .collect();
    let traversal_replaced = separators_replaced.replace("..", &PLACEHOLDER.to_string());

    traversal_replaced
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') {
                c
            } else {
                PLACEHOLDER
            }
        })
        .collect()
}

/// Lexically normalize a path, resolving `.` and `..` without touching disk.
///
/// `..` never climbs above a root; on a relative path leading `..` are kept.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Relative path leading from `from` to `to`, both normalized first.
///
/// Returns `None` when no relative path exists (one is absolute and the other
/// is not, or they live under different prefixes).
pub fn relative_path(from: &Path, to: &Path) -> Option<PathBuf> {
    let from = normalize(from);
    let to = normalize(to);
    if from.has_root() != to.has_root() {
        return None;
    }

    let from_parts: Vec<Component> = from.components().collect();
    let to_parts: Vec<Component> = to.components().collect();

    if let (Some(Component::Prefix(a)), Some(Component::Prefix(b))) =
        (from_parts.first(), to_parts.first())
    {
        if a != b {
            return None;
        }
    }

    let common = from_parts
        .iter()
        .zip(&to_parts)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from_parts.len() {
        rel.push("..");
    }
    for part in &to_parts[common..] {
        rel.push(part.as_os_str());
    }
    Some(rel)
}

/// True iff `child` is `parent` itself or lies underneath it.
pub fn is_contained(child: &Path, parent: &Path) -> bool {
    match relative_path(parent, child) {
        Some(rel) => {
            !rel.is_absolute() && !matches!(rel.components().next(), Some(Component::ParentDir))
        }
        None => false,
    }
}

/// Root that every surface-originated path must stay under.
///
/// Without a workspace the document's own directory is the root.
pub fn effective_root(document_path: &Path, workspace_root: Option<&Path>) -> Option<PathBuf> {
    match workspace_root {
        Some(root) => Some(normalize(root)),
        None => document_path.parent().map(normalize),
    }
}

/// Expand the upload folder template.
///
/// Recognized variables: `${projectRoot}`, `${file}`,
/// `${fileBasenameNoExtension}` and `${dir}`.
pub fn expand_template(template: &str, document_path: &Path, workspace_root: Option<&Path>) -> String {
    let dir = document_path.parent().unwrap_or_else(|| Path::new(""));
    let root = workspace_root.unwrap_or(dir);
    let stem = document_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    template
        .replace("${projectRoot}", &root.to_string_lossy())
        .replace("${fileBasenameNoExtension}", &stem)
        .replace("${file}", &document_path.to_string_lossy())
        .replace("${dir}", &dir.to_string_lossy())
}

/// Resolve the directory uploaded assets are written to.
///
/// The expanded template is resolved against the document's directory. If
/// that escapes the root, the sibling [`FALLBACK_UPLOAD_DIR`] is used instead;
/// the configured value is never trusted past this point.
pub fn resolve_upload_dir(
    template: &str,
    document_path: &Path,
    workspace_root: Option<&Path>,
) -> Result<PathBuf, PathError> {
    let dir = document_path
        .parent()
        .ok_or_else(|| PathError::NoParent(document_path.to_path_buf()))?;
    let root = effective_root(document_path, workspace_root)
        .ok_or_else(|| PathError::NoParent(document_path.to_path_buf()))?;

    let expanded = expand_template(template, document_path, workspace_root);
    let candidate = normalize(&dir.join(expanded.trim()));
    if is_contained(&candidate, &root) {
        return Ok(candidate);
    }

    tracing::warn!(
        "Upload folder {} escapes {}, falling back to {}",
        candidate.display(),
        root.display(),
        FALLBACK_UPLOAD_DIR
    );
    let fallback = normalize(&dir.join(FALLBACK_UPLOAD_DIR));
    if is_contained(&fallback, &root) {
        Ok(fallback)
    } else {
        Err(PathError::OutsideRoot {
            path: fallback,
            root,
        })
    }
}

/// Join a sanitized upload name onto the destination and re-check containment.
pub fn upload_target(dest_dir: &Path, name: &str) -> Result<PathBuf, PathError> {
    let safe = sanitize_filename(name);
    if safe.is_empty() {
        return Err(PathError::EmptyName);
    }
    let target = normalize(&dest_dir.join(&safe));
    if target == normalize(dest_dir) || !is_contained(&target, dest_dir) {
        return Err(PathError::OutsideRoot {
            path: target,
            root: dest_dir.to_path_buf(),
        });
    }
    Ok(target)
}

/// Where an `open-link` request should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkTarget {
    /// Absolute http(s) URL, passed through untouched
    External(String),
    /// Local file inside the root
    Local(PathBuf),
    /// Pure in-page anchor (`#heading`); the surface scrolls itself
    Anchor,
}

/// Check for an absolute `http`/`https` URL, ignoring scheme case
pub fn is_external_url(href: &str) -> bool {
    let lower = href.trim_start().get(..8).unwrap_or(href).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Classify and validate a link clicked inside the surface.
pub fn resolve_link(
    href: &str,
    document_path: &Path,
    workspace_root: Option<&Path>,
) -> Result<LinkTarget, PathError> {
    if is_external_url(href) {
        return Ok(LinkTarget::External(href.to_string()));
    }

    let local = href.split(&['#', '?'][..]).next().unwrap_or_default().trim();
    if local.is_empty() {
        return Ok(LinkTarget::Anchor);
    }

    let dir = document_path
        .parent()
        .ok_or_else(|| PathError::NoParent(document_path.to_path_buf()))?;
    let root = effective_root(document_path, workspace_root)
        .ok_or_else(|| PathError::NoParent(document_path.to_path_buf()))?;

    let target = normalize(&dir.join(local));
    if is_contained(&target, &root) {
        Ok(LinkTarget::Local(target))
    } else {
        Err(PathError::OutsideRoot { path: target, root })
    }
}

/// Render `path` relative to `base` with forward slashes, for use in markdown
pub fn markdown_relative(base: &Path, path: &Path) -> String {
    let rel = relative_path(base, path).unwrap_or_else(|| path.to_path_buf());
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_leading_dots() {
        assert_eq!(sanitize_filename(".hidden.png"), "hidden.png");
        assert_eq!(sanitize_filename("...png"), "png");
    }

    #[test]
    fn test_sanitize_replaces_traversal() {
        let safe = sanitize_filename("../../etc/passwd");
        assert!(!safe.contains('/'));
        assert!(!safe.contains(".."));
        assert_eq!(safe, "___etc_passwd");
    }

    #[test]
    fn test_sanitize_backslashes_and_unicode() {
        assert_eq!(sanitize_filename("a\\b c.png"), "a_b_c.png");
        assert_eq!(sanitize_filename("bild-ä.jpg"), "bild-_.jpg");
    }

    #[test]
    fn test_sanitize_empty_inputs() {
        assert_eq!(sanitize_filename(""), "");
        assert_eq!(sanitize_filename("...."), "");
        assert_eq!(sanitize_filename(".  "), "");
    }

    #[test]
    fn test_sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("image-01_final.png"), "image-01_final.png");
    }

    #[test]
    fn test_normalize_resolves_dots() {
        assert_eq!(normalize(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize(Path::new("/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("../a")), PathBuf::from("../a"));
    }

    #[test]
    fn test_contained_self_and_descendants() {
        let root = Path::new("/ws");
        assert!(is_contained(Path::new("/ws"), root));
        assert!(is_contained(Path::new("/ws/"), root));
        assert!(is_contained(Path::new("/ws/notes/a.md"), root));
        assert!(is_contained(Path::new("/ws/notes/../b.md"), root));
    }

    #[test]
    fn test_not_contained_siblings_and_ancestors() {
        let root = Path::new("/ws");
        assert!(!is_contained(Path::new("/"), root));
        assert!(!is_contained(Path::new("/ws2"), root));
        assert!(!is_contained(Path::new("/other/ws"), root));
        assert!(!is_contained(Path::new("/ws/notes/../../etc"), root));
        assert!(!is_contained(Path::new("relative/path"), root));
    }

    #[test]
    fn test_expand_template_variables() {
        let doc = Path::new("/ws/notes/a.md");
        let root = Path::new("/ws");
        assert_eq!(
            expand_template("${projectRoot}/img/${fileBasenameNoExtension}", doc, Some(root)),
            "/ws/img/a"
        );
        assert_eq!(expand_template("${dir}/media", doc, Some(root)), "/ws/notes/media");
        assert_eq!(expand_template("${file}", doc, None), "/ws/notes/a.md");
    }

    #[test]
    fn test_resolve_upload_dir_relative_template() {
        let dir = resolve_upload_dir("assets", Path::new("/ws/notes/a.md"), Some(Path::new("/ws")))
            .unwrap();
        assert_eq!(dir, PathBuf::from("/ws/notes/assets"));
    }

    #[test]
    fn test_resolve_upload_dir_falls_back_when_escaping() {
        let doc = Path::new("/ws/notes/a.md");
        let root = Some(Path::new("/ws"));
        assert_eq!(
            resolve_upload_dir("../../tmp", doc, root).unwrap(),
            PathBuf::from("/ws/notes/assets")
        );
        assert_eq!(
            resolve_upload_dir("/etc", doc, root).unwrap(),
            PathBuf::from("/ws/notes/assets")
        );
    }

    #[test]
    fn test_resolve_upload_dir_without_workspace_uses_document_dir() {
        let doc = Path::new("/home/me/a.md");
        assert_eq!(
            resolve_upload_dir("../shared", doc, None).unwrap(),
            PathBuf::from("/home/me/assets")
        );
    }

    #[test]
    fn test_upload_target_rejects_empty_name() {
        assert_eq!(
            upload_target(Path::new("/ws/assets"), "..."),
            Err(PathError::EmptyName)
        );
    }

    #[test]
    fn test_upload_target_stays_in_destination() {
        let dest = Path::new("/ws/notes/assets");
        let target = upload_target(dest, "../../etc/passwd").unwrap();
        assert!(target.starts_with(dest));
        assert_eq!(target, PathBuf::from("/ws/notes/assets/___etc_passwd"));
    }

    #[test]
    fn test_link_external_passthrough() {
        let doc = Path::new("/ws/a.md");
        assert_eq!(
            resolve_link("http://example.com", doc, None),
            Ok(LinkTarget::External("http://example.com".to_string()))
        );
        assert_eq!(
            resolve_link("HTTPS://Example.com/x", doc, None),
            Ok(LinkTarget::External("HTTPS://Example.com/x".to_string()))
        );
    }

    #[test]
    fn test_link_local_inside_root() {
        let doc = Path::new("/ws/notes/a.md");
        assert_eq!(
            resolve_link("../b.md#intro", doc, Some(Path::new("/ws"))),
            Ok(LinkTarget::Local(PathBuf::from("/ws/b.md")))
        );
    }

    #[test]
    fn test_link_escaping_root_is_rejected() {
        let doc = Path::new("/ws/notes/a.md");
        let result = resolve_link("../../secret.md", doc, Some(Path::new("/ws")));
        assert!(matches!(result, Err(PathError::OutsideRoot { .. })));
    }

    #[test]
    fn test_link_anchor_only() {
        let doc = Path::new("/ws/a.md");
        assert_eq!(resolve_link("#usage", doc, None), Ok(LinkTarget::Anchor));
    }

    #[test]
    fn test_markdown_relative_uses_forward_slashes() {
        assert_eq!(
            markdown_relative(Path::new("/ws/notes"), Path::new("/ws/notes/assets/x.png")),
            "assets/x.png"
        );
    }
}
