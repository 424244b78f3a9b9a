//! OpenTofu release stream: version listing from the GitHub releases API and
//! the archive/checksums/signature naming scheme.

mod releases;

pub use releases::{
    OpenTofuReleases, ReleasesError, archive_name, checksums_name, parse_release_tags,
    signature_name, signature_required,
};
