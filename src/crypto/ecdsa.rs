//! ECDSA signature verification, FIPS 186-4 §6.4.

use {
    super::{
        error::CryptoError,
        groups::CryptoGroup,
        mod_ring::{RingRefExt, UintExp, UintMont},
        named_fields,
    },
    crate::asn1::public_key_info::EcPublicKeyInfo,
    anyhow::{anyhow, ensure, Result},
    der::{asn1::UintRef, Decode, Sequence},
    num_traits::Inv,
    ruint::{
        aliases::{U192, U256, U384},
        Uint,
    },
};

type U224 = Uint<224, 4>;
type U521 = Uint<521, 9>;

pub const ID_SECP192R1: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.1");
pub const ID_SECP224R1: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.3.132.0.33");
pub const ID_SECP256R1: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
pub const ID_SECP384R1: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.3.132.0.34");
pub const ID_SECP521R1: der::asn1::ObjectIdentifier =
    der::asn1::ObjectIdentifier::new_unwrap("1.3.132.0.35");

/// `ECDSA-Sig-Value ::= SEQUENCE { r INTEGER, s INTEGER }`, RFC 3279 §2.2.3.
#[derive(Clone, Debug, Sequence)]
struct EcdsaSigValue<'a> {
    r: UintRef<'a>,
    s: UintRef<'a>,
}

#[derive(Clone, Debug)]
pub struct EcPublicKey<'g, G: CryptoGroup<'g>> {
    group: &'g G,
    point: G::BaseElement,
}

#[derive(Debug, Clone)]
pub struct EcSignature<'g, G: CryptoGroup<'g>> {
    r: G::ScalarElement,
    s: G::ScalarElement,
}

impl<'g, G: CryptoGroup<'g>> EcPublicKey<'g, G> {
    pub const fn new(group: &'g G, point: G::BaseElement) -> Self {
        Self { group, point }
    }

    /// Verifies `signature` over a (possibly curve-order-truncated) message
    /// hash `e`, per FIPS 186-4 §6.4.2.
    pub fn verify(&self, e: &G::ScalarElement, signature: &EcSignature<'g, G>) -> Result<()> {
        let EcSignature { r, s } = signature;

        // w = s^-1 mod n
        let w = s.inv().ok_or_else(|| anyhow!("signature s has no inverse"))?;
        // u1 = e*w mod n, u2 = r*w mod n
        let u1 = *e * w;
        let u2 = *r * w;
        // Q = u1*G + u2*pubkey
        let q = self.group.generator() * u1 + self.point * u2;
        let x = q
            .x()
            .ok_or_else(|| anyhow!("signature verification produced point at infinity"))?;

        ensure!(x == *r, "ECDSA signature does not verify");
        Ok(())
    }
}

/// Verifies an ECDSA signature over `message_digest` against an EC public
/// key and a DER-encoded `ECDSA-Sig-Value`. `message_digest` is truncated to
/// the curve's order length per FIPS 186-4 §6.4 if longer.
pub fn verify(
    pubkey: &EcPublicKeyInfo,
    message_digest: &[u8],
    der_signature: &[u8],
) -> Result<(), CryptoError> {
    verify_inner(pubkey, message_digest, der_signature).map_err(|_| CryptoError::BadSignature)
}

fn verify_inner(pubkey: &EcPublicKeyInfo, message_digest: &[u8], der_signature: &[u8]) -> Result<()> {
    let sig = EcdsaSigValue::from_der(der_signature)?;
    let r_bytes = sig.r.as_bytes();
    let s_bytes = sig.s.as_bytes();

    ensure!(
        pubkey.point.first() == Some(&0x04),
        "only uncompressed EC points are supported"
    );
    let coord_len = (pubkey.point.len() - 1) / 2;
    ensure!(coord_len > 0, "empty EC point");
    let x_bytes = &pubkey.point[1..1 + coord_len];
    let y_bytes = &pubkey.point[1 + coord_len..];

    macro_rules! dispatch {
        ($oid:expr, $named:ident, $u:ty, $v:ty) => {
            if pubkey.curve == $oid {
                let curve = named_fields::$named();
                let base_field = curve.base_field();
                let scalar_field = curve.scalar_field();
                let x = base_field.from(<$u>::from_be_slice(x_bytes));
                let y = base_field.from(<$u>::from_be_slice(y_bytes));
                let point = curve.from_affine(x, y)?;
                let public_key = EcPublicKey::new(curve, point);

                let r = scalar_field.from(<$v>::from_be_slice(r_bytes));
                let s = scalar_field.from(<$v>::from_be_slice(s_bytes));
                let order_bit_len = scalar_field.modulus().bit_len();
                let e = scalar_field.from(truncate_to_order::<$v>(message_digest, order_bit_len));
                return public_key.verify(&e, &EcSignature { r, s });
            }
        };
    }

    dispatch!(ID_SECP192R1, secp192r1, U192, U192);
    dispatch!(ID_SECP224R1, secp224r1, U224, U224);
    dispatch!(ID_SECP256R1, secp256r1, U256, U256);
    dispatch!(ID_SECP384R1, secp384r1, U384, U384);
    dispatch!(ID_SECP521R1, secp521r1, U521, U521);

    Err(anyhow!("unsupported EC curve: {}", pubkey.curve))
}

/// FIPS 186-4 §6.4: if the digest is longer than the curve order in bits,
/// use only the leftmost `order_bit_len` bits of the digest.
fn truncate_to_order<V: UintMont + UintExp>(digest: &[u8], order_bit_len: usize) -> V {
    let order_byte_len = (order_bit_len + 7) / 8;
    let truncated = if digest.len() > order_byte_len {
        &digest[..order_byte_len]
    } else {
        digest
    };
    V::from_be_bytes(truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_compressed_points() {
        let pubkey = EcPublicKeyInfo {
            curve: ID_SECP256R1,
            point: vec![0x02; 33],
        };
        assert!(verify(&pubkey, &[0u8; 32], &[]).is_err());
    }
}
