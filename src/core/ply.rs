// PLY mesh codec
//
// Writes vertex positions and triangle faces in ascii or binary form and
// reads back any of the three PLY encodings.

use crate::models::mesh::{MeshError, MeshResult, TriangleMesh};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Upper bound on rows reserved up front from a header's element count
const MAX_PREALLOCATED_ROWS: usize = 1 << 20;

/// Body encoding of a PLY file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyFormat {
    pub fn header_name(&self) -> &'static str {
        match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
            PlyFormat::BinaryBigEndian => "binary_big_endian",
        }
    }

    fn from_header_name(name: &str) -> MeshResult<Self> {
        match name {
            "ascii" => Ok(PlyFormat::Ascii),
            "binary_little_endian" => Ok(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Ok(PlyFormat::BinaryBigEndian),
            other => Err(MeshError::Ply(format!("unknown format '{}'", other))),
        }
    }
}

// ==============================================================================
// Header Model
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScalarType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    F32,
    F64,
}

impl ScalarType {
    fn parse(name: &str) -> MeshResult<Self> {
        Ok(match name {
            "char" | "int8" => ScalarType::I8,
            "uchar" | "uint8" => ScalarType::U8,
            "short" | "int16" => ScalarType::I16,
            "ushort" | "uint16" => ScalarType::U16,
            "int" | "int32" => ScalarType::I32,
            "uint" | "uint32" => ScalarType::U32,
            "float" | "float32" => ScalarType::F32,
            "double" | "float64" => ScalarType::F64,
            other => return Err(MeshError::Ply(format!("unknown property type '{}'", other))),
        })
    }
}

#[derive(Debug, Clone)]
enum Property {
    Scalar { name: String, ty: ScalarType },
    List { name: String, count: ScalarType, item: ScalarType },
}

impl Property {
    fn name(&self) -> &str {
        match self {
            Property::Scalar { name, .. } | Property::List { name, .. } => name,
        }
    }
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    count: usize,
    properties: Vec<Property>,
}

#[derive(Debug)]
struct Header {
    format: PlyFormat,
    elements: Vec<Element>,
}

fn read_header<R: BufRead>(reader: &mut R) -> MeshResult<Header> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    if line.trim() != "ply" {
        return Err(MeshError::Ply("missing 'ply' magic".to_string()));
    }

    let mut format = None;
    let mut elements: Vec<Element> = Vec::new();

    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Err(MeshError::Ply("unexpected end of header".to_string()));
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["end_header"] => break,
            [] | ["comment", ..] | ["obj_info", ..] => {}
            ["format", name, _version] => format = Some(PlyFormat::from_header_name(name)?),
            ["element", name, count] => {
                let count = count
                    .parse()
                    .map_err(|_| MeshError::Ply(format!("bad element count '{}'", count)))?;
                elements.push(Element {
                    name: name.to_string(),
                    count,
                    properties: Vec::new(),
                });
            }
            ["property", "list", count, item, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshError::Ply("property before element".to_string()))?;
                element.properties.push(Property::List {
                    name: name.to_string(),
                    count: ScalarType::parse(count)?,
                    item: ScalarType::parse(item)?,
                });
            }
            ["property", ty, name] => {
                let element = elements
                    .last_mut()
                    .ok_or_else(|| MeshError::Ply("property before element".to_string()))?;
                element.properties.push(Property::Scalar {
                    name: name.to_string(),
                    ty: ScalarType::parse(ty)?,
                });
            }
            other => {
                return Err(MeshError::Ply(format!("unrecognised header line '{}'", other.join(" "))))
            }
        }
    }

    let format = format.ok_or_else(|| MeshError::Ply("missing format line".to_string()))?;
    Ok(Header { format, elements })
}

// ==============================================================================
// Body Decoding
// ==============================================================================

/// Yields property values regardless of body encoding
trait ValueSource {
    fn scalar(&mut self, ty: ScalarType) -> MeshResult<f64>;
}

struct AsciiSource {
    tokens: std::vec::IntoIter<String>,
}

impl ValueSource for AsciiSource {
    fn scalar(&mut self, _ty: ScalarType) -> MeshResult<f64> {
        let token = self
            .tokens
            .next()
            .ok_or_else(|| MeshError::Ply("unexpected end of ascii body".to_string()))?;
        token
            .parse()
            .map_err(|_| MeshError::Ply(format!("bad ascii value '{}'", token)))
    }
}

struct BinarySource<R> {
    reader: R,
    big_endian: bool,
}

macro_rules! read_binary {
    ($self:ident, $t:ty) => {{
        let mut buf = [0u8; std::mem::size_of::<$t>()];
        $self.reader.read_exact(&mut buf)?;
        if $self.big_endian {
            <$t>::from_be_bytes(buf) as f64
        } else {
            <$t>::from_le_bytes(buf) as f64
        }
    }};
}

impl<R: Read> ValueSource for BinarySource<R> {
    fn scalar(&mut self, ty: ScalarType) -> MeshResult<f64> {
        Ok(match ty {
            ScalarType::I8 => read_binary!(self, i8),
            ScalarType::U8 => read_binary!(self, u8),
            ScalarType::I16 => read_binary!(self, i16),
            ScalarType::U16 => read_binary!(self, u16),
            ScalarType::I32 => read_binary!(self, i32),
            ScalarType::U32 => read_binary!(self, u32),
            ScalarType::F32 => read_binary!(self, f32),
            ScalarType::F64 => read_binary!(self, f64),
        })
    }
}

fn to_index(value: f64) -> MeshResult<u32> {
    if value < 0.0 || value.fract() != 0.0 || value > u32::MAX as f64 {
        return Err(MeshError::Ply(format!("invalid vertex index {}", value)));
    }
    Ok(value as u32)
}

fn read_body<S: ValueSource>(source: &mut S, header: &Header) -> MeshResult<TriangleMesh> {
    let mut vertices = Vec::new();
    let mut faces = Vec::new();

    for element in &header.elements {
        match element.name.as_str() {
            "vertex" => {
                let position = |axis: &str| element.properties.iter().position(|p| p.name() == axis);
                let (ix, iy, iz) = match (position("x"), position("y"), position("z")) {
                    (Some(x), Some(y), Some(z)) => (x, y, z),
                    _ => return Err(MeshError::Ply("vertex element lacks x/y/z".to_string())),
                };
                vertices.reserve(element.count.min(MAX_PREALLOCATED_ROWS));

                for _ in 0..element.count {
                    let mut v = [0.0f32; 3];
                    for (i, property) in element.properties.iter().enumerate() {
                        let value = read_property(source, property)?;
                        if let Some(value) = value.first() {
                            if i == ix {
                                v[0] = *value as f32;
                            } else if i == iy {
                                v[1] = *value as f32;
                            } else if i == iz {
                                v[2] = *value as f32;
                            }
                        }
                    }
                    vertices.push(v);
                }
            }
            "face" => {
                let indices_at = element
                    .properties
                    .iter()
                    .position(|p| matches!(p, Property::List { name, .. } if name == "vertex_indices" || name == "vertex_index"))
                    .ok_or_else(|| MeshError::Ply("face element lacks vertex_indices".to_string()))?;
                faces.reserve(element.count.min(MAX_PREALLOCATED_ROWS));

                for _ in 0..element.count {
                    for (i, property) in element.properties.iter().enumerate() {
                        let values = read_property(source, property)?;
                        if i != indices_at || values.len() < 3 {
                            continue;
                        }
                        // Fan-triangulate polygons
                        let first = to_index(values[0])?;
                        for pair in values[1..].windows(2) {
                            faces.push([first, to_index(pair[0])?, to_index(pair[1])?]);
                        }
                    }
                }
            }
            _ => {
                for _ in 0..element.count {
                    for property in &element.properties {
                        read_property(source, property)?;
                    }
                }
            }
        }
    }

    TriangleMesh::new(vertices, faces)
}

fn read_property<S: ValueSource>(source: &mut S, property: &Property) -> MeshResult<Vec<f64>> {
    match property {
        Property::Scalar { ty, .. } => Ok(vec![source.scalar(*ty)?]),
        Property::List { count, item, .. } => {
            let n = source.scalar(*count)?;
            if n < 0.0 {
                return Err(MeshError::Ply(format!("negative list length {}", n)));
            }
            (0..n as usize).map(|_| source.scalar(*item)).collect()
        }
    }
}

/// Decode a PLY stream
pub fn decode_ply<R: BufRead>(mut reader: R) -> MeshResult<TriangleMesh> {
    let header = read_header(&mut reader)?;

    match header.format {
        PlyFormat::Ascii => {
            let mut body = String::new();
            reader.read_to_string(&mut body)?;
            let tokens: Vec<String> = body.split_whitespace().map(str::to_string).collect();
            read_body(&mut AsciiSource { tokens: tokens.into_iter() }, &header)
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let mut source = BinarySource {
                reader,
                big_endian: header.format == PlyFormat::BinaryBigEndian,
            };
            read_body(&mut source, &header)
        }
    }
}

/// Load a mesh from a PLY file
pub fn read_ply(path: &Path) -> MeshResult<TriangleMesh> {
    let file = File::open(path)?;
    decode_ply(BufReader::new(file))
}

// ==============================================================================
// Encoding
// ==============================================================================

/// Encode a mesh as PLY into any writer
pub fn encode_ply<W: Write>(mesh: &TriangleMesh, writer: &mut W, format: PlyFormat) -> MeshResult<()> {
    writeln!(writer, "ply")?;
    writeln!(writer, "format {} 1.0", format.header_name())?;
    writeln!(writer, "comment generated by bodymeasure")?;
    writeln!(writer, "element vertex {}", mesh.vertex_count())?;
    writeln!(writer, "property float x")?;
    writeln!(writer, "property float y")?;
    writeln!(writer, "property float z")?;
    writeln!(writer, "element face {}", mesh.face_count())?;
    writeln!(writer, "property list uchar int vertex_indices")?;
    writeln!(writer, "end_header")?;

    match format {
        PlyFormat::Ascii => {
            for v in &mesh.vertices {
                writeln!(writer, "{} {} {}", v[0], v[1], v[2])?;
            }
            for f in &mesh.faces {
                writeln!(writer, "3 {} {} {}", f[0], f[1], f[2])?;
            }
        }
        PlyFormat::BinaryLittleEndian | PlyFormat::BinaryBigEndian => {
            let big_endian = format == PlyFormat::BinaryBigEndian;
            for v in &mesh.vertices {
                for c in v {
                    let bytes = if big_endian { c.to_be_bytes() } else { c.to_le_bytes() };
                    writer.write_all(&bytes)?;
                }
            }
            for f in &mesh.faces {
                writer.write_all(&[3u8])?;
                for &i in f {
                    let i = i32::try_from(i)
                        .map_err(|_| MeshError::Ply(format!("index {} exceeds int range", i)))?;
                    let bytes = if big_endian { i.to_be_bytes() } else { i.to_le_bytes() };
                    writer.write_all(&bytes)?;
                }
            }
        }
    }

    Ok(())
}

/// Write a mesh to a PLY file
pub fn write_ply(mesh: &TriangleMesh, path: &Path, format: PlyFormat) -> MeshResult<()> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    encode_ply(mesh, &mut writer, format)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn quad() -> TriangleMesh {
        TriangleMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.5]],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .unwrap()
    }

    #[test]
    fn test_binary_little_endian_roundtrip() {
        let mut buf = Vec::new();
        encode_ply(&quad(), &mut buf, PlyFormat::BinaryLittleEndian).unwrap();
        let decoded = decode_ply(Cursor::new(buf)).unwrap();
        assert_eq!(decoded, quad());
    }

    #[test]
    fn test_ascii_header_layout() {
        let mut buf = Vec::new();
        encode_ply(&quad(), &mut buf, PlyFormat::Ascii).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("ply\nformat ascii 1.0\n"));
        assert!(text.contains("element vertex 4\n"));
        assert!(text.contains("element face 2\n"));
        assert!(text.ends_with("3 0 2 3\n"));
    }

    #[test]
    fn test_reads_foreign_layout() {
        // Extra vertex properties, a quad face, int8 list counts and an unknown element
        let text = "ply\r\n\
format ascii 1.0\r\n\
comment exported elsewhere\r\n\
element vertex 4\r\n\
property double x\r\n\
property double y\r\n\
property double z\r\n\
property uchar red\r\n\
element face 1\r\n\
property list char uint vertex_index\r\n\
element material 1\r\n\
property float shininess\r\n\
end_header\r\n\
0 0 0 255\r\n\
1 0 0 255\r\n\
1 1 0 255\r\n\
0 1 0 255\r\n\
4 0 1 2 3\r\n\
0.5\r\n";
        let mesh = decode_ply(Cursor::new(text.as_bytes())).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.faces, vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.vertices[2], [1.0, 1.0, 0.0]);
    }

    #[test]
    fn test_big_endian_body() {
        let mut buf = Vec::new();
        encode_ply(&quad(), &mut buf, PlyFormat::BinaryBigEndian).unwrap();
        let decoded = decode_ply(Cursor::new(buf)).unwrap();
        assert_eq!(decoded.vertices, quad().vertices);
    }

    #[test]
    fn test_rejects_missing_magic() {
        let result = decode_ply(Cursor::new(b"obj\nformat ascii 1.0\nend_header\n".to_vec()));
        assert!(matches!(result, Err(MeshError::Ply(_))));
    }

    #[test]
    fn test_huge_declared_counts_fail_on_short_body() {
        let text = "ply\nformat ascii 1.0\nelement vertex 18446744073709551615\nproperty float x\nproperty float y\nproperty float z\n\
end_header\n0 0 0\n";
        assert!(matches!(decode_ply(Cursor::new(text.as_bytes())), Err(MeshError::Ply(_))));

        let mut binary = b"ply\nformat binary_little_endian 1.0\nelement vertex 4\nproperty float x\nproperty float y\nproperty float z\n\
element face 4294967295\nproperty list uchar int vertex_indices\nend_header\n"
            .to_vec();
        binary.extend(std::iter::repeat(0u8).take(4 * 12));
        binary.push(3);
        binary.extend_from_slice(&[0, 0, 0, 0, 1, 0, 0, 0, 2, 0, 0, 0]);
        assert!(matches!(decode_ply(Cursor::new(binary)), Err(MeshError::Io(_))));
    }

    #[test]
    fn test_rejects_out_of_range_face() {
        let text = "ply\nformat ascii 1.0\nelement vertex 1\nproperty float x\nproperty float y\nproperty float z\n\
element face 1\nproperty list uchar int vertex_indices\nend_header\n0 0 0\n3 0 1 2\n";
        assert!(matches!(
            decode_ply(Cursor::new(text.as_bytes())),
            Err(MeshError::FaceIndexOutOfRange { .. })
        ));
    }

    #[test]
    fn test_write_and_read_file() {
        let dir = std::env::temp_dir().join(format!("ply_test_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("result.ply");

        write_ply(&quad(), &path, PlyFormat::Ascii).unwrap();
        assert_eq!(read_ply(&path).unwrap(), quad());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
