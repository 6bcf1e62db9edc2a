//! Deterministic registry fingerprinting.

use blake3::Hasher;

use crate::{Direction, PayloadRegistry, Registries};

/// Computes a fingerprint over both registries.
///
/// Two peers agree on the fingerprint exactly when they registered the same
/// identifiers at the same indices in the same directions.
#[must_use]
pub fn registries_fingerprint<P>(registries: &Registries<P>) -> u64 {
    let mut hasher = Hasher::new();
    for direction in Direction::ALL {
        write_registry(&mut hasher, registries.registry(direction));
    }
    let hash = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash.as_bytes()[0..8]);
    u64::from_le_bytes(bytes)
}

fn write_registry<P>(hasher: &mut Hasher, registry: &PayloadRegistry<P>) {
    write_u8(
        hasher,
        match registry.direction() {
            Direction::ToServer => 0,
            Direction::ToClient => 1,
        },
    );
    write_u32(hasher, registry.len() as u32);
    for entry in registry.iter() {
        write_u32(hasher, entry.index());
        write_str(hasher, entry.id().namespace());
        write_str(hasher, entry.id().path());
    }
}

fn write_u8(hasher: &mut Hasher, value: u8) {
    hasher.update(&[value]);
}

fn write_u32(hasher: &mut Hasher, value: u32) {
    hasher.update(&value.to_le_bytes());
}

fn write_str(hasher: &mut Hasher, value: &str) {
    write_u32(hasher, value.len() as u32);
    hasher.update(value.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Identifier, PayloadCodec, PayloadResult};
    use bytestream::{ByteReader, ByteWriter};

    fn enc(_: &(), _: &mut ByteWriter, _: &PayloadRegistry<()>) -> PayloadResult<()> {
        Ok(())
    }

    fn dec(_: &mut ByteReader<'_>, _: &PayloadRegistry<()>) -> PayloadResult<()> {
        Ok(())
    }

    fn registries(entries: &[(Direction, &'static str)]) -> Registries<()> {
        let mut out = Registries::new();
        for (direction, path) in entries {
            out.register(
                *direction,
                Identifier::from_static("test", path),
                PayloadCodec::new(enc, dec),
            )
            .unwrap();
        }
        out
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = registries(&[(Direction::ToServer, "a"), (Direction::ToClient, "b")]);
        let b = registries(&[(Direction::ToServer, "a"), (Direction::ToClient, "b")]);
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_depends_on_direction_and_order() {
        let base = registries(&[(Direction::ToServer, "a"), (Direction::ToServer, "b")]);
        let swapped = registries(&[(Direction::ToServer, "b"), (Direction::ToServer, "a")]);
        let moved = registries(&[(Direction::ToServer, "a"), (Direction::ToClient, "b")]);
        assert_ne!(base.fingerprint(), swapped.fingerprint());
        assert_ne!(base.fingerprint(), moved.fingerprint());
    }

    #[test]
    fn empty_registries_have_a_fingerprint() {
        let empty = Registries::<()>::new();
        assert_eq!(empty.fingerprint(), Registries::<()>::new().fingerprint());
    }
}
