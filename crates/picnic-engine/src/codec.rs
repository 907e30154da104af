//! Binary encode/decode for node messages.
//!
//! All integers and floats are little-endian. Sequences are prefixed with
//! a `u32` element count. Every frame starts with a one-byte tag: the
//! [`ExchangeKind`] tag for worker-to-worker frames, [`PROBLEM_TAG`] and
//! [`RESULT_TAG`] for master traffic. A frame must be consumed exactly;
//! trailing bytes are malformed.

use std::io::{self, Read, Write};

use picnic_core::{Cell, IntBox, NodeId, Particle, ParticleId, ProtocolError};
use picnic_space::Grid;

use crate::messages::{ExchangeKind, ExchangeMessage, ProblemMessage, ResultMessage};

/// Tag byte of a [`ProblemMessage`] frame.
pub const PROBLEM_TAG: u8 = 0x10;
/// Tag byte of a [`ResultMessage`] frame.
pub const RESULT_TAG: u8 = 0x11;

/// Encoded size of one particle.
const PARTICLE_BYTES: usize = 8 + 11 * 8;
/// Encoded size of one cell.
const CELL_BYTES: usize = Cell::COMPONENTS * 8;

fn malformed(e: io::Error) -> ProtocolError {
    ProtocolError::MalformedFrame {
        detail: e.to_string(),
    }
}

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), ProtocolError> {
    w.write_all(&[v]).map_err(malformed)
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), ProtocolError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian u64.
pub fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), ProtocolError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), ProtocolError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), ProtocolError> {
    w.write_all(&v.to_le_bytes()).map_err(malformed)
}

fn write_len(w: &mut dyn Write, len: usize) -> Result<(), ProtocolError> {
    let len = u32::try_from(len).map_err(|_| ProtocolError::MalformedFrame {
        detail: format!("sequence of {len} elements exceeds u32"),
    })?;
    write_u32_le(w, len)
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, ProtocolError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, ProtocolError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian u64.
pub fn read_u64_le(r: &mut dyn Read) -> Result<u64, ProtocolError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(u64::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, ProtocolError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, ProtocolError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf).map_err(malformed)?;
    Ok(f64::from_le_bytes(buf))
}

/// Read a sequence length and check it against the bytes left.
fn read_len(r: &mut &[u8], element_bytes: usize) -> Result<usize, ProtocolError> {
    let len = read_u32_le(r)? as usize;
    if len.saturating_mul(element_bytes) > r.len() {
        return Err(ProtocolError::MalformedFrame {
            detail: format!(
                "sequence of {len} elements does not fit in {} remaining bytes",
                r.len()
            ),
        });
    }
    Ok(len)
}

// ── Value types ─────────────────────────────────────────────────

fn write_particle(w: &mut dyn Write, p: &Particle) -> Result<(), ProtocolError> {
    write_u64_le(w, p.id.0)?;
    for v in [
        p.x, p.y, p.vx, p.vy, p.ax, p.ay, p.mass, p.charge, p.ex, p.ey, p.bz,
    ] {
        write_f64_le(w, v)?;
    }
    Ok(())
}

fn read_particle(r: &mut dyn Read) -> Result<Particle, ProtocolError> {
    let id = ParticleId(read_u64_le(r)?);
    let mut v = [0.0; 11];
    for slot in &mut v {
        *slot = read_f64_le(r)?;
    }
    let [x, y, vx, vy, ax, ay, mass, charge, ex, ey, bz] = v;
    Ok(Particle {
        id,
        x,
        y,
        vx,
        vy,
        ax,
        ay,
        mass,
        charge,
        ex,
        ey,
        bz,
    })
}

fn write_particles(w: &mut dyn Write, ps: &[Particle]) -> Result<(), ProtocolError> {
    write_len(w, ps.len())?;
    ps.iter().try_for_each(|p| write_particle(w, p))
}

fn read_particles(r: &mut &[u8]) -> Result<Vec<Particle>, ProtocolError> {
    let len = read_len(r, PARTICLE_BYTES)?;
    (0..len).map(|_| read_particle(r)).collect()
}

fn write_cell(w: &mut dyn Write, c: &Cell) -> Result<(), ProtocolError> {
    c.components().iter().try_for_each(|v| write_f64_le(w, *v))
}

fn read_cell(r: &mut dyn Read) -> Result<Cell, ProtocolError> {
    let mut c = [0.0; Cell::COMPONENTS];
    for slot in &mut c {
        *slot = read_f64_le(r)?;
    }
    Ok(Cell::from_components(c))
}

fn write_cells(w: &mut dyn Write, cells: &[Cell]) -> Result<(), ProtocolError> {
    write_len(w, cells.len())?;
    cells.iter().try_for_each(|c| write_cell(w, c))
}

fn read_cells(r: &mut &[u8]) -> Result<Vec<Cell>, ProtocolError> {
    let len = read_len(r, CELL_BYTES)?;
    (0..len).map(|_| read_cell(r)).collect()
}

fn write_box(w: &mut dyn Write, b: &IntBox) -> Result<(), ProtocolError> {
    write_i32_le(w, b.min_x())?;
    write_i32_le(w, b.max_x())?;
    write_i32_le(w, b.min_y())?;
    write_i32_le(w, b.max_y())
}

fn read_box(r: &mut dyn Read) -> Result<IntBox, ProtocolError> {
    let (min_x, max_x) = (read_i32_le(r)?, read_i32_le(r)?);
    let (min_y, max_y) = (read_i32_le(r)?, read_i32_le(r)?);
    IntBox::new(min_x, max_x, min_y, max_y).map_err(|e| ProtocolError::MalformedFrame {
        detail: e.to_string(),
    })
}

fn write_grid(w: &mut dyn Write, g: &Grid) -> Result<(), ProtocolError> {
    write_u32_le(w, g.cells_x() as u32)?;
    write_u32_le(w, g.cells_y() as u32)?;
    write_f64_le(w, g.cell_width())?;
    write_f64_le(w, g.cell_height())?;
    write_cells(w, g.cells())
}

fn read_grid(r: &mut &[u8]) -> Result<Grid, ProtocolError> {
    let cells_x = read_u32_le(r)? as usize;
    let cells_y = read_u32_le(r)? as usize;
    let width = read_f64_le(r)?;
    let height = read_f64_le(r)?;
    let cells = read_cells(r)?;
    Grid::from_cells(cells_x, cells_y, width, height, cells).map_err(|e| {
        ProtocolError::MalformedFrame {
            detail: e.to_string(),
        }
    })
}

fn expect_end(r: &[u8]) -> Result<(), ProtocolError> {
    if r.is_empty() {
        Ok(())
    } else {
        Err(ProtocolError::MalformedFrame {
            detail: format!("{} trailing bytes", r.len()),
        })
    }
}

fn expect_tag(r: &mut dyn Read, expected: u8, name: &'static str) -> Result<(), ProtocolError> {
    let tag = read_u8(r)?;
    if tag == expected {
        return Ok(());
    }
    let found = match tag {
        PROBLEM_TAG => "problem",
        RESULT_TAG => "result",
        t => match ExchangeKind::from_tag(t) {
            Ok(k) => k.name(),
            Err(e) => return Err(e),
        },
    };
    Err(ProtocolError::UnexpectedMessage {
        expected: name,
        found,
    })
}

// ── Exchange frames ─────────────────────────────────────────────

/// Encode a worker-to-worker message.
pub fn encode_exchange(msg: &ExchangeMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    write_u8(&mut buf, msg.kind().tag())?;
    match msg {
        ExchangeMessage::ArrivingParticles(ps) | ExchangeMessage::GhostParticles(ps) => {
            write_particles(&mut buf, ps)?
        }
        ExchangeMessage::GhostCells(cells) => write_cells(&mut buf, cells)?,
        ExchangeMessage::GhostCellIndexes(indexes) => {
            write_len(&mut buf, indexes.len())?;
            for &(x, y) in indexes {
                write_i32_le(&mut buf, x)?;
                write_i32_le(&mut buf, y)?;
            }
        }
    }
    Ok(buf)
}

/// Decode a worker-to-worker message.
pub fn decode_exchange(frame: &[u8]) -> Result<ExchangeMessage, ProtocolError> {
    let mut r = frame;
    let kind = ExchangeKind::from_tag(read_u8(&mut r)?)?;
    let msg = match kind {
        ExchangeKind::ArrivingParticles => {
            ExchangeMessage::ArrivingParticles(read_particles(&mut r)?)
        }
        ExchangeKind::GhostParticles => ExchangeMessage::GhostParticles(read_particles(&mut r)?),
        ExchangeKind::GhostCells => ExchangeMessage::GhostCells(read_cells(&mut r)?),
        ExchangeKind::GhostCellIndexes => {
            let len = read_len(&mut r, 8)?;
            let indexes = (0..len)
                .map(|_| -> Result<(i32, i32), ProtocolError> {
                    Ok((read_i32_le(&mut r)?, read_i32_le(&mut r)?))
                })
                .collect::<Result<Vec<_>, _>>()?;
            ExchangeMessage::GhostCellIndexes(indexes)
        }
    };
    expect_end(r)?;
    Ok(msg)
}

// ── Master frames ───────────────────────────────────────────────

/// Encode a problem for one worker.
pub fn encode_problem(msg: &ProblemMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    write_u8(&mut buf, PROBLEM_TAG)?;
    write_len(&mut buf, msg.partitions.len())?;
    for b in &msg.partitions {
        write_box(&mut buf, b)?;
    }
    write_particles(&mut buf, &msg.particles)?;
    write_grid(&mut buf, &msg.cells)?;
    Ok(buf)
}

/// Decode a problem.
pub fn decode_problem(frame: &[u8]) -> Result<ProblemMessage, ProtocolError> {
    let mut r = frame;
    expect_tag(&mut r, PROBLEM_TAG, "problem")?;
    let count = read_len(&mut r, 16)?;
    let partitions = (0..count)
        .map(|_| read_box(&mut r))
        .collect::<Result<Vec<_>, _>>()?;
    let particles = read_particles(&mut r)?;
    let cells = read_grid(&mut r)?;
    expect_end(r)?;
    Ok(ProblemMessage {
        partitions,
        particles,
        cells,
    })
}

/// Encode a worker's result.
pub fn encode_result(msg: &ResultMessage) -> Result<Vec<u8>, ProtocolError> {
    let mut buf = Vec::new();
    write_u8(&mut buf, RESULT_TAG)?;
    write_u32_le(&mut buf, msg.worker.0)?;
    write_particles(&mut buf, &msg.particles)?;
    write_grid(&mut buf, &msg.cells)?;
    Ok(buf)
}

/// Decode a worker's result.
pub fn decode_result(frame: &[u8]) -> Result<ResultMessage, ProtocolError> {
    let mut r = frame;
    expect_tag(&mut r, RESULT_TAG, "result")?;
    let worker = NodeId(read_u32_le(&mut r)?);
    let particles = read_particles(&mut r)?;
    let cells = read_grid(&mut r)?;
    expect_end(r)?;
    Ok(ResultMessage {
        worker,
        particles,
        cells,
    })
}
