/// Wavefront OBJ parser
use nalgebra::Point3;
use nom::{
    bytes::complete::{tag, take_while},
    character::complete::{i64 as index, space0, space1},
    combinator::eof,
    multi::many1,
    number::complete::float,
    sequence::{pair, preceded, terminated},
    IResult,
};

use crate::error::{MeshError, ParseError};
use crate::format::MeshFormat;
use crate::geometry::{Color, Mesh};

/// Parse OBJ text into an indexed mesh.
///
/// Polygons are fan-triangulated from their first corner. Only positions,
/// optional vertex colors (`v x y z r g b`) and faces are read; other
/// statements are skipped.
pub fn parse_obj(data: &[u8]) -> Result<Mesh, ParseError> {
    let text = std::str::from_utf8(data).map_err(|e| {
        ParseError::new(MeshFormat::Obj, e.valid_up_to(), "input is not valid UTF-8")
    })?;

    let mut builder = ObjBuilder::default();
    let mut line_start = 0;

    for raw_line in text.split_inclusive('\n') {
        let offset = line_start;
        line_start += raw_line.len();

        let line = raw_line.trim_end_matches(&['\r', '\n'][..]);
        let line = line.split('#').next().unwrap_or_default().trim_end();
        builder.statement(line, offset)?;
    }

    builder.finish()
}

#[derive(Default)]
struct ObjBuilder {
    positions: Vec<Point3<f32>>,
    colors: Vec<Option<Color>>,
    faces: Vec<[u32; 3]>,
    /// Byte offset of the `f` statement each triangle came from
    face_offsets: Vec<usize>,
}

impl ObjBuilder {
    fn statement(&mut self, line: &str, offset: usize) -> Result<(), ParseError> {
        let keyword = line.split_whitespace().next().unwrap_or_default();
        match keyword {
            "v" => {
                let values = run(vertex_statement, line, offset)?;
                let (position, color) = match values.as_slice() {
                    [x, y, z] | [x, y, z, _] => (Point3::new(*x, *y, *z), None),
                    [x, y, z, r, g, b] => (Point3::new(*x, *y, *z), Some(Color::new(*r, *g, *b))),
                    other => {
                        return Err(ParseError::new(
                            MeshFormat::Obj,
                            offset,
                            format!("vertex has {} components", other.len()),
                        ))
                    }
                };
                self.positions.push(position);
                self.colors.push(color);
            }
            "f" => {
                let raw = run(face_statement, line, offset)?;
                if raw.len() < 3 {
                    return Err(ParseError::new(
                        MeshFormat::Obj,
                        offset,
                        format!("face has {} vertices, need at least 3", raw.len()),
                    ));
                }
                let corners = raw
                    .into_iter()
                    .map(|i| self.resolve(i, offset))
                    .collect::<Result<Vec<_>, _>>()?;

                // Fan around the first corner
                for pair in corners[1..].windows(2) {
                    self.faces.push([corners[0], pair[0], pair[1]]);
                    self.face_offsets.push(offset);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// 1-based (or negative, relative) OBJ index to a 0-based index
    fn resolve(&self, raw: i64, offset: usize) -> Result<u32, ParseError> {
        let count = self.positions.len() as i64;
        let resolved = match raw {
            0 => None,
            i if i > 0 => Some(i - 1),
            i => Some(count + i).filter(|&r| r >= 0),
        };
        resolved
            .and_then(|r| u32::try_from(r).ok())
            .ok_or_else(|| ParseError::new(MeshFormat::Obj, offset, format!("invalid vertex index {}", raw)))
    }

    fn finish(self) -> Result<Mesh, ParseError> {
        let vertex_count = self.positions.len();
        let mut mesh = Mesh::indexed(self.positions, self.faces).map_err(|e| {
            let offset = match &e {
                MeshError::IndexOutOfRange { face, .. } => self.face_offsets[*face],
                MeshError::ColorCountMismatch { .. } => 0,
            };
            ParseError::new(MeshFormat::Obj, offset, e.to_string())
        })?;

        let colored = self.colors.iter().filter(|c| c.is_some()).count();
        if colored == vertex_count && vertex_count > 0 {
            let colors = self.colors.into_iter().flatten().collect();
            mesh.set_colors(colors)
                .map_err(|e| ParseError::new(MeshFormat::Obj, 0, e.to_string()))?;
        } else if colored > 0 {
            log::warn!(
                "OBJ vertex colors present on {} of {} vertices, ignoring them",
                colored,
                vertex_count
            );
        }
        Ok(mesh)
    }
}

/// Run a statement parser over a full line, mapping failures to the byte where they occurred
fn run<'a, T>(
    parser: impl Fn(&'a str) -> IResult<&'a str, T>,
    line: &'a str,
    offset: usize,
) -> Result<T, ParseError> {
    match parser(line) {
        Ok((_, value)) => Ok(value),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::new(
            MeshFormat::Obj,
            offset + line.len() - e.input.len(),
            format!("malformed statement {:?}", line.trim()),
        )),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            MeshFormat::Obj,
            offset + line.len(),
            "statement ended early",
        )),
    }
}

fn vertex_statement(input: &str) -> IResult<&str, Vec<f32>> {
    let (input, _) = preceded(space0, tag("v"))(input)?;
    terminated(many1(preceded(space1, float)), pair(space0, eof))(input)
}

fn face_statement(input: &str) -> IResult<&str, Vec<i64>> {
    let (input, _) = preceded(space0, tag("f"))(input)?;
    terminated(many1(preceded(space1, index_group)), pair(space0, eof))(input)
}

/// `v`, `v/t`, `v//n` or `v/t/n`; only the position index is kept
fn index_group(input: &str) -> IResult<&str, i64> {
    let (input, position) = index(input)?;
    let (input, _) = take_while(|c: char| c == '/' || c == '-' || c.is_ascii_digit())(input)?;
    Ok((input, position))
}
