//! Binary tensor files.
//!
//! Little-endian, fixed width, no padding: symmetry, name, status flags,
//! bonds, labels, then the flat element buffer when elements are set.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use super::{Layout, Status, Tensor, check_bond_order, check_labels};
use crate::error::{TensorError, TensorResult};
use crate::scalar::Scalar;
use crate::symmetry::{Bond, BondType, Parity, Qnum, Symmetry};

const HAS_BONDS: i32 = 1;
const HAS_ELEMENTS: i32 = 2;
const DIAGONAL: i32 = 4;

impl<T: Scalar> Tensor<T> {
    /// Writes the tensor to `writer`.
    pub fn save<W: Write>(&self, writer: &mut W) -> TensorResult<()> {
        writer.write_i32::<LittleEndian>(self.symmetry.as_i32())?;
        writer.write_u64::<LittleEndian>(self.name.len() as u64)?;
        writer.write_all(self.name.as_bytes())?;

        let status = self.status();
        let mut flags = 0;
        if status.has_bonds {
            flags |= HAS_BONDS;
        }
        if status.has_elements {
            flags |= HAS_ELEMENTS;
        }
        if self.is_diag() {
            flags |= DIAGONAL;
        }
        writer.write_i32::<LittleEndian>(flags)?;

        writer.write_u64::<LittleEndian>(self.bonds.len() as u64)?;
        writer.write_u64::<LittleEndian>(Qnum::ENCODED_SIZE)?;
        for bond in &self.bonds {
            write_bond(writer, bond)?;
        }
        writer.write_u64::<LittleEndian>(self.labels.len() as u64)?;
        for &label in &self.labels {
            writer.write_i32::<LittleEndian>(label)?;
        }
        if status.has_elements {
            for &x in &self.elem {
                x.write_le(writer)?;
            }
        }
        Ok(())
    }

    /// Reads a tensor written by [`Tensor::save`].
    pub fn load<R: Read>(reader: &mut R) -> TensorResult<Tensor<T>> {
        let symmetry_tag = reader.read_i32::<LittleEndian>()?;
        let symmetry = Symmetry::from_i32(symmetry_tag)
            .ok_or_else(|| TensorError::format(format!("unknown symmetry tag {symmetry_tag}")))?;

        let name_len = reader.read_u64::<LittleEndian>()?;
        let mut name = Vec::new();
        reader.by_ref().take(name_len).read_to_end(&mut name)?;
        if name.len() as u64 != name_len {
            return Err(TensorError::format(format!(
                "name of {name_len} bytes, file holds {}",
                name.len()
            )));
        }
        let name = String::from_utf8(name).map_err(|e| TensorError::format(format!("tensor name: {e}")))?;

        let flags = reader.read_i32::<LittleEndian>()?;
        let bond_count = read_len(reader)?;
        let qnum_size = reader.read_u64::<LittleEndian>()?;
        if qnum_size != Qnum::ENCODED_SIZE {
            return Err(TensorError::format(format!(
                "quantum number size {qnum_size}, expected {}",
                Qnum::ENCODED_SIZE
            )));
        }
        let mut bonds = Vec::new();
        for _ in 0..bond_count {
            bonds.push(read_bond(reader)?);
        }

        let label_count = read_len(reader)?;
        if label_count != bond_count {
            return Err(TensorError::format(format!(
                "{label_count} labels for {bond_count} bonds"
            )));
        }
        let mut labels = Vec::new();
        for _ in 0..label_count {
            labels.push(reader.read_i32::<LittleEndian>()?);
        }

        check_bond_order(&bonds)?;
        check_labels(&labels, bonds.len())?;
        let inferred = Symmetry::infer(&bonds);
        if inferred != symmetry {
            return Err(TensorError::format(format!(
                "header says {symmetry:?}, bonds give {inferred:?}"
            )));
        }
        let row_num = bonds.iter().filter(|b| b.ty() == BondType::In).count();
        let layout = Layout::build(&bonds, row_num, symmetry, flags & DIAGONAL != 0)
            .map_err(|e| TensorError::format(e.to_string()))?;
        if layout.is_empty() {
            return Err(TensorError::NoSymmetryBlock);
        }

        // Element count is only trusted as far as the file backs it.
        let has_elements = flags & HAS_ELEMENTS != 0;
        let elem = if has_elements {
            let mut elem = Vec::new();
            for _ in 0..layout.elem_num() {
                elem.push(T::read_le(reader)?);
            }
            elem
        } else {
            vec![T::zero(); layout.elem_num()]
        };
        let tensor = Tensor {
            name,
            bonds,
            labels,
            symmetry,
            layout,
            elem,
            status: Status {
                has_bonds: true,
                has_elements,
            },
        };
        debug!(name = %tensor.name, elem_num = tensor.elem_num(), "loaded tensor");
        Ok(tensor)
    }

    pub fn save_file(&self, path: impl AsRef<Path>) -> TensorResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load_file(path: impl AsRef<Path>) -> TensorResult<Tensor<T>> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::load(&mut reader)
    }
}

fn write_bond<W: Write>(writer: &mut W, bond: &Bond) -> TensorResult<()> {
    writer.write_i32::<LittleEndian>(bond.ty().as_i32())?;
    writer.write_u64::<LittleEndian>(bond.qnum_count() as u64)?;
    for q in bond.qnums() {
        writer.write_i32::<LittleEndian>(q.u1())?;
        writer.write_i32::<LittleEndian>(q.prt().as_i32())?;
        writer.write_i32::<LittleEndian>(q.prt_f().as_i32())?;
    }
    for &deg in bond.degeneracies() {
        writer.write_u64::<LittleEndian>(deg as u64)?;
    }
    Ok(())
}

fn read_bond<R: Read>(reader: &mut R) -> TensorResult<Bond> {
    let tag = reader.read_i32::<LittleEndian>()?;
    let ty = BondType::from_i32(tag).ok_or_else(|| TensorError::format(format!("unknown bond type {tag}")))?;
    let count = read_len(reader)?;
    let mut qnums = Vec::new();
    for _ in 0..count {
        let u1 = reader.read_i32::<LittleEndian>()?;
        let prt = read_parity(reader)?;
        let prt_f = read_parity(reader)?;
        qnums.push(Qnum::fermionic(prt_f, u1, prt));
    }
    let mut runs = Vec::with_capacity(qnums.len());
    for q in qnums {
        runs.push((q, read_len(reader)?));
    }
    Bond::from_degeneracies(ty, &runs).map_err(|e| TensorError::format(e.to_string()))
}

fn read_parity<R: Read>(reader: &mut R) -> TensorResult<Parity> {
    let value = reader.read_i32::<LittleEndian>()?;
    Parity::from_i32(value).ok_or_else(|| TensorError::format(format!("parity {value} is not 0 or 1")))
}

fn read_len<R: Read>(reader: &mut R) -> TensorResult<usize> {
    let value = reader.read_u64::<LittleEndian>()?;
    usize::try_from(value).map_err(|_| TensorError::format(format!("length {value} does not fit in memory")))
}
