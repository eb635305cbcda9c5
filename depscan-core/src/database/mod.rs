pub mod memory;
pub mod ports;
pub mod postgres;

use depscan_model::PackageDescriptor;
use sha2::{Digest, Sha256};

use crate::error::Result;

/// SHA-256 over the canonical JSON encoding of a descriptor.
///
/// Field order is fixed by the type and every set is ordered, so equal
/// descriptors always produce the same bytes.
pub fn descriptor_digest(descriptor: &PackageDescriptor) -> Result<String> {
    let canonical = serde_json::to_vec(descriptor)?;
    Ok(hex::encode(Sha256::digest(&canonical)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use depscan_model::{Identifier, VcsInfo};

    fn descriptor() -> PackageDescriptor {
        let id = Identifier::new("NPM", "", "lodash", "4.17.21");
        let mut pkg = PackageDescriptor::new(id);
        pkg.declared_licenses = ["MIT".to_string()].into();
        pkg
    }

    #[test]
    fn equal_descriptors_share_a_digest() {
        let a = descriptor();
        let mut b = descriptor();
        b.authors.insert("John".into());
        b.authors.remove("John");
        assert_eq!(
            descriptor_digest(&a).unwrap(),
            descriptor_digest(&b).unwrap()
        );
        assert_eq!(descriptor_digest(&a).unwrap().len(), 64);
    }

    #[test]
    fn same_coordinates_with_other_metadata_differ() {
        let a = descriptor();
        let mut b = descriptor();
        b.vcs = VcsInfo {
            url: "https://github.com/lodash/lodash.git".into(),
            ..VcsInfo::default()
        };
        assert_eq!(a.id, b.id);
        assert_ne!(
            descriptor_digest(&a).unwrap(),
            descriptor_digest(&b).unwrap()
        );
    }
}
