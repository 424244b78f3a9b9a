//! Terraform release stream: version listing from the HashiCorp release
//! index and the archive/checksums/signature naming scheme.

mod releases;

pub use releases::{
    ReleasesError, TerraformReleases, archive_name, checksums_name, parse_release_index,
    signature_name, signature_required,
};
