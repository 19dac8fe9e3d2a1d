/// STL file parser for binary and ASCII formats
use std::f32::consts::FRAC_PI_2;

use nalgebra::Point3;
use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, multispace1, not_line_ending},
    combinator::eof,
    multi::many0,
    number::complete::float,
    sequence::preceded,
    IResult,
};

use crate::error::ParseError;
use crate::format::MeshFormat;
use crate::geometry::Mesh;
use crate::transform::{EulerRotation, Transform};

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

/// Parse a binary STL file into a triangle soup (no up-axis correction)
pub fn parse_binary_stl(data: &[u8]) -> Result<Mesh, ParseError> {
    if data.len() < HEADER_LEN + 4 {
        return Err(ParseError::new(
            MeshFormat::Stl,
            data.len(),
            "file too small to be a valid STL",
        ));
    }

    // Triangle count follows the 80-byte header (4 bytes, little-endian)
    let triangle_count = read_u32(data, HEADER_LEN) as usize;
    let body = &data[HEADER_LEN + 4..];
    let complete = body.len() / RECORD_LEN;
    if complete < triangle_count {
        return Err(ParseError::new(
            MeshFormat::Stl,
            HEADER_LEN + 4 + complete * RECORD_LEN,
            format!(
                "header declares {} triangles but record {} is truncated",
                triangle_count, complete
            ),
        ));
    }
    if body.len() > triangle_count * RECORD_LEN {
        log::debug!(
            "ignoring {} trailing bytes after {} STL records",
            body.len() - triangle_count * RECORD_LEN,
            triangle_count
        );
    }

    let mut positions = Vec::with_capacity(triangle_count * 3);
    for record in body.chunks_exact(RECORD_LEN).take(triangle_count) {
        // 12 bytes of facet normal, then 3 vertices; the normal is recomputed downstream
        for corner in 0..3 {
            let base = 12 + corner * 12;
            positions.push(Point3::new(
                read_f32(record, base),
                read_f32(record, base + 4),
                read_f32(record, base + 8),
            ));
        }
        // Trailing 2-byte attribute count is ignored
    }

    Ok(Mesh::soup(positions))
}

/// Parse an ASCII STL file into a triangle soup (no up-axis correction)
pub fn parse_ascii_stl(input: &str) -> Result<Mesh, ParseError> {
    match parse_ascii_stl_impl(input) {
        Ok((_, mesh)) => Ok(mesh),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError::new(
            MeshFormat::Stl,
            input.len() - e.input.len(),
            format!("malformed ASCII STL ({:?})", e.code),
        )),
        Err(nom::Err::Incomplete(_)) => Err(ParseError::new(
            MeshFormat::Stl,
            input.len(),
            "ASCII STL ended early",
        )),
    }
}

fn parse_ascii_stl_impl(input: &str) -> IResult<&str, Mesh> {
    let (input, _) = preceded(multispace0, tag("solid"))(input)?;
    let (input, _) = not_line_ending(input)?; // Optional name
    let (input, facets) = many0(parse_facet)(input)?;
    let (input, _) = preceded(multispace0, tag("endsolid"))(input)?;
    let (input, _) = not_line_ending(input)?;
    let (input, _) = multispace0(input)?;
    let (input, _) = eof(input)?;

    let positions = facets.into_iter().flatten().collect();
    Ok((input, Mesh::soup(positions)))
}

fn parse_facet(input: &str) -> IResult<&str, [Point3<f32>; 3]> {
    let (input, _) = preceded(multispace0, tag("facet"))(input)?;
    let (input, _) = preceded(multispace1, tag("normal"))(input)?;
    let (input, _normal) = parse_vector3(input)?;
    let (input, _) = preceded(multispace0, tag("outer"))(input)?;
    let (input, _) = preceded(multispace1, tag("loop"))(input)?;
    let (input, v1) = parse_vertex(input)?;
    let (input, v2) = parse_vertex(input)?;
    let (input, v3) = parse_vertex(input)?;
    let (input, _) = preceded(multispace0, tag("endloop"))(input)?;
    let (input, _) = preceded(multispace0, tag("endfacet"))(input)?;

    Ok((input, [v1, v2, v3]))
}

fn parse_vertex(input: &str) -> IResult<&str, Point3<f32>> {
    let (input, _) = preceded(multispace0, tag("vertex"))(input)?;
    let (input, (x, y, z)) = parse_vector3(input)?;
    Ok((input, Point3::new(x, y, z)))
}

fn parse_vector3(input: &str) -> IResult<&str, (f32, f32, f32)> {
    let (input, _) = multispace0(input)?;
    let (input, x) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, y) = float(input)?;
    let (input, _) = multispace1(input)?;
    let (input, z) = float(input)?;
    Ok((input, (x, y, z)))
}

/// Detect and parse STL file (binary or ASCII), then rotate Z-up to Y-up
pub fn parse_stl(data: &[u8]) -> Result<Mesh, ParseError> {
    let mut mesh = detect_and_parse(data)?;
    mesh.transform_positions(&Transform::rotation_matrix(&EulerRotation::new(
        -FRAC_PI_2, 0.0, 0.0,
    )));
    Ok(mesh)
}

fn detect_and_parse(data: &[u8]) -> Result<Mesh, ParseError> {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    if !data[start..].starts_with(b"solid") {
        return parse_binary_stl(data);
    }

    // Binary exporters sometimes start the header with "solid" too
    let ascii = match std::str::from_utf8(data) {
        Ok(text) => parse_ascii_stl(text),
        Err(e) => Err(ParseError::new(MeshFormat::Stl, e.valid_up_to(), "input is not valid UTF-8")),
    };
    match ascii {
        Ok(mesh) => Ok(mesh),
        Err(ascii_err) => match parse_binary_stl(data) {
            Ok(mesh) => {
                log::warn!("STL header starts with \"solid\" but the body is binary");
                Ok(mesh)
            }
            Err(_) => Err(ascii_err),
        },
    }
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}

fn read_f32(data: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([data[offset], data[offset + 1], data[offset + 2], data[offset + 3]])
}
