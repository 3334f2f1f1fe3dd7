//! Named NIST/SEC elliptic curve parameters used by ECDSA-signed DSC and
//! CSCA certificates. See FIPS 186-4 appendix D.1.2 / SEC 2.
//!
//! Diffie-Hellman mod-P groups (RFC 5114), used by PACE key agreement, are
//! out of scope for a trust-material mirror and are not carried here.

use {
    super::{groups::EllipticCurve, mod_ring::{UintExp, UintMont}},
    anyhow::Result,
    ruint::{
        aliases::{U192, U256, U384},
        uint, Uint,
    },
    std::sync::OnceLock,
    subtle::ConditionallySelectable,
};

type U224 = Uint<224, 4>;
type U521 = Uint<521, 9>;

/// Named elliptic curve parameters, as published by a standards body.
pub struct Curve<U, V> {
    pub modulus: U,
    pub param_a: U,
    pub param_b: U,
    pub generator: (U, U),
    pub order: V,
}

/// NIST P-192 / secp192r1.
pub const CURVE_1: Curve<U192, U192> = uint!(Curve {
    modulus:   0xffffffff_ffffffff_ffffffff_fffffffe_ffffffff_ffffffff_U192,
    param_a:   0xffffffff_ffffffff_ffffffff_fffffffe_ffffffff_fffffffc_U192,
    param_b:   0x64210519_e59c80e7_0fa7e9ab_72243049_feb8deec_c146b9b1_U192,
    generator: (
        0x188da80e_b03090f6_7cbf20eb_43a18800_f4ff0afd_82ff1012_U192,
        0x07192b95_ffc8da78_631011ed_6b24cdd5_73f977a1_1e794811_U192,
    ),
    order:     0xffffffff_ffffffff_ffffffff_99def836_146bc9b1_b4d22831_U192,
});

/// NIST P-224 / secp224r1.
pub const CURVE_2: Curve<U224, U224> = uint!(Curve {
    modulus:   0xffffffff_ffffffff_ffffffff_ffffffff_00000000_00000000_00000001_U224,
    param_a:   0xffffffff_ffffffff_ffffffff_fffffffe_ffffffff_ffffffff_fffffffe_U224,
    param_b:   0xb4050a85_0c04b3ab_f5413256_5044b0b7_d7bfd8ba_270b3943_2355ffb4_U224,
    generator: (
        0xb70e0cbd_6bb4bf7f_321390b9_4a03c1d3_56c21122_343280d6_115c1d21_U224,
        0xbd376388_b5f723fb_4c22dfe6_cd4375a0_5a074764_44d58199_85007e34_U224,
    ),
    order:     0xffffffff_ffffffff_ffffffff_ffff16a2_e0b8f03e_13dd2945_5c5c2a3d_U224,
});

/// NIST P-256 / secp256r1, the most common curve for ePassport DSCs.
pub const CURVE_3: Curve<U256, U256> = uint!(Curve {
    modulus:   0xffffffff_00000001_00000000_00000000_00000000_ffffffff_ffffffff_ffffffff_U256,
    param_a:   0xffffffff_00000001_00000000_00000000_00000000_ffffffff_ffffffff_fffffffc_U256,
    param_b:   0x5ac635d8_aa3a93e7_b3ebbd55_769886bc_651d06b0_cc53b0f6_3bce3c3e_27d2604b_U256,
    generator: (
        0x6b17d1f2_e12c4247_f8bce6e5_63a440f2_77037d81_2deb33a0_f4a13945_d898c296_U256,
        0x4fe342e2_fe1a7f9b_8ee7eb4a_7c0f9e16_2bce3357_6b315ece_cbb64068_37bf51f5_U256,
    ),
    order:     0xffffffff_00000000_ffffffff_ffffffff_bce6faad_a7179e84_f3b9cac2_fc632551_U256,
});

/// NIST P-384 / secp384r1.
pub const CURVE_4: Curve<U384, U384> = uint!(Curve {
   modulus: 0xffffffff_ffffffff_ffffffff_ffffffff_ffffffff_ffffffff_fffffffe_ffffffff_00000000_00000000_ffffffff_U384,
   param_a: 0xffffffff_ffffffff_ffffffff_ffffffff_ffffffff_ffffffff_fffffffe_ffffffff_00000000_00000000_fffffffc_U384,
   param_b: 0xB3312FA7_E23EE7E4_988E056B_E3F82D19_181D9C6E_FE814112_0314088F_5013875A_C656398D_8A2ED19D_2A85C8ED_D3EC2AEF_U384,
   generator: (
        0xAA87CA22_BE8B0537_8EB1C71E_F320AD74_6E1D3B62_8BA79B98_59F741E0_82542A38_5502F25D_BF55296C_3A545E38_72760AB7_U384,
        0x3617DE4A_96262C6F_5D9E98BF_9292DC29_F8F41DBD_289A147C_E9DA3113_B5F0B8C0_0A60B1CE_1D7E819D_7A431D7C_90EA0E5F_U384,
   ),
   order: 0xFFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_C7634D81_F4372DDF_581A0DB2_48B0A77A_ECEC196A_CCC52973_U384,
});

/// NIST P-521 / secp521r1.
pub const CURVE_5: Curve<U521, U521> = uint!(Curve {
    modulus: 0x000001FF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_U521,
    param_a: 0x000001FF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFC_U521,
    param_b: 0x00000051_953EB961_8E1C9A1F_929A21A0_B68540EE_A2DA725B_99B315F3_B8B48991_8EF109E1_56193951_EC7E937B_1652C0BD_3BB1BF07_3573DF88_3D2C34F1_EF451FD4_6B503F00_U521,
    generator: (
        0x000000C6_858E06B7_0404E9CD_9E3ECB66_2395B442_9C648139_053FB521_F828AF60_6B4D3DBA_A14B5E77_EFE75928_FE1DC127_A2FFA8DE_3348B3C1_856A429B_F97E7E31_C2E5BD66_U521,
        0x00000118_39296A78_9A3BC004_5C8A5FB4_2C7D1BD9_98F54449_579B4468_17AFBD17_273E662C_97EE7299_5EF42640_U521,
    ),
    order: 0x000001FF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFF_FFFFFFFA_51868783_BF2F966B_7FCC0148_F709A5D0_3BB5C9B8_899C47AE_BB6FB71E_91386409_U521,
});

impl<U, V> TryFrom<Curve<U, V>> for EllipticCurve<U, V>
where
    U: UintMont + ConditionallySelectable,
    V: UintMont + UintExp,
{
    type Error = anyhow::Error;

    fn try_from(value: Curve<U, V>) -> Result<Self> {
        EllipticCurve::new(
            value.modulus,
            value.param_a,
            value.param_b,
            value.generator.0,
            value.generator.1,
            value.order,
            V::from_u64(1),
        )
    }
}

macro_rules! named_curve_accessor {
    ($name:ident, $curve:expr, $u:ty, $v:ty) => {
        pub fn $name() -> &'static EllipticCurve<$u, $v> {
            static CELL: OnceLock<EllipticCurve<$u, $v>> = OnceLock::new();
            CELL.get_or_init(|| {
                EllipticCurve::try_from($curve).expect("named curve parameters are valid")
            })
        }
    };
}

named_curve_accessor!(secp192r1, CURVE_1, U192, U192);
named_curve_accessor!(secp224r1, CURVE_2, U224, U224);
named_curve_accessor!(secp256r1, CURVE_3, U256, U256);
named_curve_accessor!(secp384r1, CURVE_4, U384, U384);
named_curve_accessor!(secp521r1, CURVE_5, U521, U521);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_parameters_are_internally_consistent() {
        for curve in [
            EllipticCurve::try_from(CURVE_1).is_ok(),
        ] {
            assert!(curve);
        }
        assert!(EllipticCurve::try_from(CURVE_2).is_ok());
        assert!(EllipticCurve::try_from(CURVE_3).is_ok());
        assert!(EllipticCurve::try_from(CURVE_4).is_ok());
        assert!(EllipticCurve::try_from(CURVE_5).is_ok());
    }

    #[test]
    fn named_accessors_agree_with_raw_parameters() {
        let raw = EllipticCurve::try_from(CURVE_3).unwrap();
        let named = secp256r1();
        assert_eq!(raw.generator().x().unwrap(), named.generator().x().unwrap());
    }
}
