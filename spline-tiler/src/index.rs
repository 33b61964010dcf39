use core::ops;

use either::Either;

/// Triangle-index storage which keeps 16-bit elements for as long as every index
/// value fits, upgrading to 32-bit only when one does not.
///
/// Emitted chunks stay within the 16-bit domain because the assembler clamps its
/// vertex budget, but input part meshes may be arbitrarily large.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum IndexBuffer {
    /// 16-bit indices.
    U16(Vec<u16>),
    /// 32-bit indices.
    U32(Vec<u32>),
}

impl IndexBuffer {
    /// Creates an empty [`IndexBuffer`]. Does not allocate.
    #[inline]
    pub const fn new() -> Self {
        Self::U16(Vec::new())
    }

    /// Returns a slice-reference-like handle to the contents of this buffer.
    /// Use this for all read operations.
    ///
    /// Panics if the given range exceeds the length of `self`.
    #[inline]
    pub fn as_slice<R>(&self, range: R) -> IndexSlice<'_>
    where
        [u16]: ops::Index<R, Output = [u16]>,
        [u32]: ops::Index<R, Output = [u32]>,
    {
        match self {
            IndexBuffer::U16(vec) => IndexSlice::U16(&vec.as_slice()[range]),
            IndexBuffer::U32(vec) => IndexSlice::U32(&vec.as_slice()[range]),
        }
    }

    /// As per [`Vec::len()`].
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            IndexBuffer::U16(vec) => vec.len(),
            IndexBuffer::U32(vec) => vec.len(),
        }
    }

    /// As per [`Vec::is_empty()`].
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resets the buffer to zero length, keeping its capacity and element type.
    #[inline]
    pub fn clear(&mut self) {
        match self {
            IndexBuffer::U16(vec) => vec.clear(),
            IndexBuffer::U32(vec) => vec.clear(),
        }
    }

    /// Appends `source`'s indices with `offset` added to each value.
    ///
    /// This is the rebasing operation used when a part's triangles are copied
    /// into a chunk whose vertex buffer already holds `offset` vertices. Storage
    /// is upgraded to 32-bit on the first rebased value that does not fit in 16.
    pub fn extend_rebased(&mut self, source: IndexSlice<'_>, offset: u32) {
        let rebased = source.iter_u32().map(|index| index + offset);
        match self {
            IndexBuffer::U16(u16_vec) => {
                let mut rebased = rebased;
                while let Some(index) = rebased.next() {
                    match u16::try_from(index) {
                        Ok(small) => u16_vec.push(small),
                        Err(_) => {
                            *self = upgrade_to_u32(u16_vec, index, rebased);
                            return;
                        }
                    }
                }
            }
            IndexBuffer::U32(vec) => vec.extend(rebased),
        }
    }
}

#[cold]
fn upgrade_to_u32(
    u16_vec: &mut Vec<u16>,
    non_fitting_element: u32,
    rest: impl Iterator<Item = u32>,
) -> IndexBuffer {
    IndexBuffer::U32(
        core::mem::take(u16_vec)
            .into_iter()
            .map(u32::from)
            .chain([non_fitting_element])
            .chain(rest)
            .collect(),
    )
}

impl Default for IndexBuffer {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<u32> for IndexBuffer {
    fn from_iter<T: IntoIterator<Item = u32>>(iter: T) -> Self {
        let values: Vec<u32> = iter.into_iter().collect();
        let mut buffer = Self::new();
        buffer.extend_rebased(IndexSlice::U32(&values), 0);
        buffer
    }
}

/// Borrowed view of [`IndexBuffer`] contents, in either element width.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[expect(clippy::exhaustive_enums)]
pub enum IndexSlice<'a> {
    /// 16-bit indices.
    U16(&'a [u16]),
    /// 32-bit indices.
    U32(&'a [u32]),
}

impl<'a> IndexSlice<'a> {
    /// Returns the number of indices in this slice.
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            IndexSlice::U16(slice) => slice.len(),
            IndexSlice::U32(slice) => slice.len(),
        }
    }

    /// Returns whether this slice is empty (`len() == 0`).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the index data interpreted as bytes in **native endianness**,
    /// suitable for copying into a GPU index buffer.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        match self {
            IndexSlice::U16(slice) => bytemuck::must_cast_slice::<u16, u8>(slice),
            IndexSlice::U32(slice) => bytemuck::must_cast_slice::<u32, u8>(slice),
        }
    }

    /// Returns the indices in this slice, each converted unconditionally to [`u32`].
    #[inline]
    pub fn iter_u32(&self) -> impl Iterator<Item = u32> + 'a {
        match *self {
            IndexSlice::U16(slice) => Either::Left(slice.iter().copied().map(u32::from)),
            IndexSlice::U32(slice) => Either::Right(slice.iter().copied()),
        }
    }
}
