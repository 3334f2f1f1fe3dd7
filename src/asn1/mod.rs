//! Pure ASN.1 types, no application logic.
//!
//! Parsing is done as deeply as practical: a `SignatureAlgorithmIdentifier` is
//! parsed into an enum of the known OIDs with a catch-all for unrecognized
//! ones. This keeps rich types available to the application without losing
//! the ability to round-trip unknown input.

pub mod emrtd;
pub mod master_list;
pub mod public_key_info;
pub mod signature_algorithm_identifier;

pub use signature_algorithm_identifier::SignatureAlgorithmIdentifier;
use der::{asn1::ObjectIdentifier as Oid, Any, Sequence, ValueOrd};

/// An `AlgorithmIdentifier` whose parameters we have not parsed further.
#[derive(Clone, Debug, Eq, PartialEq, PartialOrd, Ord, Sequence, ValueOrd)]
pub struct AnyAlgorithmIdentifier {
    pub algorithm: Oid,
    pub parameters: Option<Any>,
}
