//! Batch payload codec.
//!
//! Body layout: `[count: varu32]` then per item `[type index: varu32][item body]`.
//! Indices refer to the registry the batch itself is registered in.

use bytestream::{ByteReader, ByteWriter};
use protocol::{PayloadError, PayloadRegistry, PayloadResult};

use crate::payload::{Batch, Payload, PayloadKind};

fn nested_batch() -> PayloadError {
    PayloadError::InvalidValue {
        field: "batch item",
        reason: "batches cannot be nested".to_owned(),
    }
}

pub(crate) fn encode_batch(
    payload: &Payload,
    w: &mut ByteWriter,
    registry: &PayloadRegistry<Payload>,
) -> PayloadResult<()> {
    let Payload::Batch(batch) = payload else {
        return Err(PayloadError::TypeMismatch {
            expected: PayloadKind::Batch.identifier(),
        });
    };
    w.write_len(batch.items.len())?;
    for item in &batch.items {
        if item.kind() == PayloadKind::Batch {
            return Err(nested_batch());
        }
        let entry = registry.resolve(item)?;
        w.write_varu32(entry.index());
        entry.encode(item, w, registry)?;
    }
    Ok(())
}

pub(crate) fn decode_batch(
    r: &mut ByteReader<'_>,
    registry: &PayloadRegistry<Payload>,
) -> PayloadResult<Payload> {
    let count = r.read_count()?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        let index = r.read_varu32()?;
        let entry = registry
            .by_index(index)
            .ok_or(PayloadError::UnknownTypeIndex { index })?;
        if *entry.id() == PayloadKind::Batch.identifier() {
            return Err(nested_batch());
        }
        items.push(entry.decode(r, registry)?);
    }
    Ok(Payload::Batch(Batch { items }))
}
