use crate::{ByteOrder, Error};

fn take<'a>(bytes: &'a [u8], pos: &mut usize, count: usize) -> Result<&'a [u8], Error> {
    let end = pos.checked_add(count).ok_or(Error::UnexpectedEnd)?;
    let slice = bytes.get(*pos..end).ok_or(Error::UnexpectedEnd)?;
    *pos = end;

    Ok(slice)
}

pub(crate) fn read_u8(bytes: &[u8], pos: &mut usize) -> Result<u8, Error> {
    Ok(take(bytes, pos, 1)?[0])
}

pub(crate) fn read_u16(bytes: &[u8], pos: &mut usize, order: ByteOrder) -> Result<u16, Error> {
    let raw: [u8; 2] = take(bytes, pos, 2)?.try_into().unwrap();

    Ok(match order {
        ByteOrder::Big => u16::from_be_bytes(raw),
        ByteOrder::Little => u16::from_le_bytes(raw),
    })
}

pub(crate) fn read_u32(bytes: &[u8], pos: &mut usize, order: ByteOrder) -> Result<u32, Error> {
    let raw: [u8; 4] = take(bytes, pos, 4)?.try_into().unwrap();

    Ok(match order {
        ByteOrder::Big => u32::from_be_bytes(raw),
        ByteOrder::Little => u32::from_le_bytes(raw),
    })
}

pub(crate) fn read_f32(bytes: &[u8], pos: &mut usize, order: ByteOrder) -> Result<f32, Error> {
    let raw: [u8; 4] = take(bytes, pos, 4)?.try_into().unwrap();

    Ok(match order {
        ByteOrder::Big => f32::from_be_bytes(raw),
        ByteOrder::Little => f32::from_le_bytes(raw),
    })
}

pub(crate) fn read_f64(bytes: &[u8], pos: &mut usize, order: ByteOrder) -> Result<f64, Error> {
    let raw: [u8; 8] = take(bytes, pos, 8)?.try_into().unwrap();

    Ok(match order {
        ByteOrder::Big => f64::from_be_bytes(raw),
        ByteOrder::Little => f64::from_le_bytes(raw),
    })
}

/// Reads a length-prefixed name; invalid utf-8 is replaced, not rejected,
/// since trackable names come from external tooling.
pub(crate) fn read_name(bytes: &[u8], pos: &mut usize, len: usize) -> Result<String, Error> {
    Ok(String::from_utf8_lossy(take(bytes, pos, len)?).into_owned())
}
