//! Trust boundary between the surface and the filesystem
//!
//! - `path` - filename sanitization, containment, upload/link resolution
//! - `css` - filtering of user-supplied style text

mod css;
mod path;

pub use css::sanitize_css;
pub use path::{
    effective_root, expand_template, is_contained, is_external_url, markdown_relative,
    normalize, relative_path, resolve_link, resolve_upload_dir, sanitize_filename, upload_target,
    LinkTarget, PathError, FALLBACK_UPLOAD_DIR, PLACEHOLDER,
};
