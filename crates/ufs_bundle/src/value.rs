//! Schema driven decoding of object data into [`Value`] graphs.

use std::{borrow::Cow, sync::Arc};

use binrw::Endian;
use indexmap::IndexMap;

use crate::{
    cursor::ByteCursor,
    error::{Error, Result},
    format::IdWidth,
    pointer::ObjectPointer,
    type_tree::TypeTreeNode,
};

/// A decoded value
///
/// Strings and byte or char arrays are kept as raw bytes, use [`Value::as_str`] to decode them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    /// `bool`
    Bool(bool),
    /// `SInt8`
    I8(i8),
    /// `UInt8` or `char`
    U8(u8),
    /// `SInt16` or `short`
    I16(i16),
    /// `UInt16` or `unsigned short`
    U16(u16),
    /// `SInt32` or `int`
    I32(i32),
    /// `UInt32` or `unsigned int`
    U32(u32),
    /// `SInt64` or `long long`
    I64(i64),
    /// `UInt64` or `unsigned long long`
    U64(u64),
    /// `float`
    F32(f32),
    /// `double`
    F64(f64),
    /// A `string` or an array of `UInt8`/`char`, undecoded
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_bytes"))]
    Bytes(Vec<u8>),
    /// Any other array, one value per element
    Array(Vec<Value>),
    /// `pair`, first and second in declared order
    Pair(Box<(Value, Value)>),
    /// Any other type, decoded field by field
    Record(Record),
    /// `PPtr<...>`, left unresolved
    Pointer(ObjectPointer),
}

impl Value {
    /// The boolean, if this is a `bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Any integer that fits in an `i64`
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::I8(v) => Some(v as i64),
            Value::U8(v) => Some(v as i64),
            Value::I16(v) => Some(v as i64),
            Value::U16(v) => Some(v as i64),
            Value::I32(v) => Some(v as i64),
            Value::U32(v) => Some(v as i64),
            Value::I64(v) => Some(v),
            Value::U64(v) => i64::try_from(v).ok(),
            _ => None,
        }
    }

    /// Either float width as an `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::F32(v) => Some(v as f64),
            Value::F64(v) => Some(v),
            _ => None,
        }
    }

    /// Raw bytes of a string or byte array, however the array was decoded
    pub fn as_bytes(&self) -> Option<Cow<'_, [u8]>> {
        match self {
            Value::Bytes(bytes) => Some(Cow::Borrowed(bytes)),
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::U8(b) => Some(*b),
                    Value::I8(b) => Some(*b as u8),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()
                .map(Cow::Owned),
            _ => None,
        }
    }

    /// Bytes decoded as UTF-8 text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Bytes(bytes) => std::str::from_utf8(bytes).ok(),
            _ => None,
        }
    }

    /// Elements of a non byte array
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Both halves of a `pair`
    pub fn as_pair(&self) -> Option<(&Value, &Value)> {
        match self {
            Value::Pair(pair) => Some((&pair.0, &pair.1)),
            _ => None,
        }
    }

    /// The record, if this is one
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }

    /// The unresolved pointer, see [`crate::asset::Asset::resolve_object`] to follow it
    pub fn as_pointer(&self) -> Option<&ObjectPointer> {
        match self {
            Value::Pointer(pointer) => Some(pointer),
            _ => None,
        }
    }
}

#[cfg(feature = "serde")]
fn serialize_bytes<S: serde::Serializer>(
    bytes: &[u8],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match std::str::from_utf8(bytes) {
        Ok(text) => serializer.serialize_str(text),
        Err(_) => serializer.collect_seq(bytes),
    }
}

/// A record value, its fields in declaration order along with the schema it was read with
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<TypeTreeNode>,
    fields: IndexMap<String, Value>,
}

impl Record {
    /// Wrap already decoded fields, keyed in declaration order
    pub fn new(schema: Arc<TypeTreeNode>, fields: IndexMap<String, Value>) -> Self {
        Self { schema, fields }
    }

    /// The schema node this record was decoded from
    pub fn schema(&self) -> &Arc<TypeTreeNode> {
        &self.schema
    }

    /// Type name of the schema node
    pub fn type_name(&self) -> &str {
        &self.schema.type_name
    }

    /// Field by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// Fields in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Field names in declaration order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(|k| k.as_str())
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the record has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The `m_Name` field as text, if present
    pub fn name(&self) -> Option<&str> {
        self.get("m_Name").and_then(Value::as_str)
    }

    /// Take the fields, dropping the schema
    pub fn into_fields(self) -> IndexMap<String, Value> {
        self.fields
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Record {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.fields.iter())
    }
}

/// Reads values from an object data region
///
/// A reader owns its cursor, so concurrent reads each need their own reader.
pub struct ValueReader<'a> {
    cursor: ByteCursor<'a>,
    pointer_ids: IdWidth,
}

impl<'a> ValueReader<'a> {
    /// Read from `data` starting at `offset`
    ///
    /// Alignment is relative to the start of `data`, so pass the whole object data region
    /// rather than a slice starting at the object.
    pub fn new(data: &'a [u8], offset: u64, endian: Endian, pointer_ids: IdWidth) -> Self {
        let mut cursor = ByteCursor::new(data, endian);
        cursor.set_position(offset);
        Self {
            cursor,
            pointer_ids,
        }
    }

    /// Current offset into the region
    pub fn position(&self) -> u64 {
        self.cursor.position()
    }

    /// Decode one value described by `node`
    pub fn read_value(&mut self, node: &Arc<TypeTreeNode>) -> Result<Value> {
        let start = self.cursor.position();
        let mut align = false;

        let value = match node.type_name.as_str() {
            "bool" => Value::Bool(self.cursor.read_bool()?),
            "SInt8" => Value::I8(self.cursor.read()?),
            "UInt8" | "char" => Value::U8(self.cursor.read()?),
            "SInt16" | "short" => Value::I16(self.cursor.read()?),
            "UInt16" | "unsigned short" => Value::U16(self.cursor.read()?),
            "SInt32" | "int" => Value::I32(self.cursor.read()?),
            "UInt32" | "unsigned int" => Value::U32(self.cursor.read()?),
            "SInt64" | "long long" => Value::I64(self.cursor.read()?),
            "UInt64" | "unsigned long long" => Value::U64(self.cursor.read()?),
            "float" => {
                self.cursor.align(4);
                Value::F32(self.cursor.read()?)
            }
            "double" => {
                self.cursor.align(4);
                Value::F64(self.cursor.read()?)
            }
            "string" => {
                let len = self.read_len()?;
                align = node.children.first().is_some_and(|c| c.post_align());
                Value::Bytes(self.cursor.read_bytes(len)?.to_vec())
            }
            _ if node.is_pointer() => Value::Pointer(self.read_pointer()?),
            _ => {
                if let Some(array) = array_node(node) {
                    align = true;
                    let element = array
                        .children
                        .get(1)
                        .ok_or_else(|| Error::MalformedArray(node.type_name.clone()))?;
                    let count = self.read_len()?;
                    if is_byte_like(element) {
                        self.read_byte_run(count)?
                    } else {
                        self.read_elements(element, count)?
                    }
                } else if node.type_name == "pair" && node.children.len() == 2 {
                    let first = self.read_value(&node.children[0])?;
                    let second = self.read_value(&node.children[1])?;
                    Value::Pair(Box::new((first, second)))
                } else {
                    let mut fields = IndexMap::with_capacity(node.children.len());
                    for child in &node.children {
                        let value = self.read_value(child)?;
                        fields.insert(child.name.clone(), value);
                    }
                    Value::Record(Record::new(node.clone(), fields))
                }
            }
        };

        let consumed = self.cursor.position() - start;
        if node.size > 0 && consumed < node.size as u64 {
            return Err(Error::SizeMismatch {
                type_name: node.type_name.clone(),
                expected: node.size,
                actual: consumed,
            });
        }

        if align || node.post_align() {
            self.cursor.align(4);
        }

        Ok(value)
    }

    fn read_len(&mut self) -> Result<usize> {
        let len = self.cursor.read::<i32>()?;
        usize::try_from(len).map_err(|_| Error::InvalidLength(len))
    }

    fn read_pointer(&mut self) -> Result<ObjectPointer> {
        let file_id = self.cursor.read::<i32>()?;
        let path_id = match self.pointer_ids {
            IdWidth::Wide => self.cursor.read::<i64>()?,
            IdWidth::Narrow => self.cursor.read::<i32>()? as i64,
        };
        Ok(ObjectPointer { file_id, path_id })
    }

    pub(crate) fn read_byte_run(&mut self, count: usize) -> Result<Value> {
        Ok(Value::Bytes(self.cursor.read_bytes(count)?.to_vec()))
    }

    pub(crate) fn read_elements(&mut self, element: &Arc<TypeTreeNode>, count: usize) -> Result<Value> {
        let mut items = Vec::with_capacity(count.min(self.cursor.remaining().len()));
        for _ in 0..count {
            let start = self.cursor.position();
            items.push(self.read_value(element)?);
            // zero sized elements never run out of input
            if self.cursor.position() == start && count > self.cursor.remaining().len() {
                return Err(Error::InvalidLength(i32::try_from(count).unwrap_or(i32::MAX)));
            }
        }
        Ok(Value::Array(items))
    }
}

/// The node carrying the array flag, the node itself or its first child
fn array_node(node: &Arc<TypeTreeNode>) -> Option<&Arc<TypeTreeNode>> {
    if node.is_array {
        Some(node)
    } else {
        node.children.first().filter(|c| c.is_array)
    }
}

fn is_byte_like(node: &TypeTreeNode) -> bool {
    matches!(node.type_name.as_str(), "UInt8" | "char")
}

#[cfg(test)]
pub(crate) mod test {
    use std::sync::Arc;

    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use super::{Value, ValueReader};
    use crate::{
        error::{Error, Result},
        format::IdWidth,
        pointer::ObjectPointer,
        type_tree::{TypeTreeNode, FLAG_ALIGN},
    };

    pub(crate) fn node(
        type_name: &str,
        name: &str,
        size: i32,
        children: Vec<Arc<TypeTreeNode>>,
    ) -> Arc<TypeTreeNode> {
        Arc::new(TypeTreeNode {
            type_name: type_name.into(),
            name: name.into(),
            size,
            children,
            ..Default::default()
        })
    }

    /// `vector` of `element`, shaped the way the engine declares arrays
    pub(crate) fn vector(name: &str, element: Arc<TypeTreeNode>) -> Arc<TypeTreeNode> {
        let array = Arc::new(TypeTreeNode {
            type_name: "Array".into(),
            name: "Array".into(),
            size: -1,
            is_array: true,
            flags: FLAG_ALIGN,
            children: vec![node("int", "size", 4, vec![]), element],
            ..Default::default()
        });
        node("vector", name, -1, vec![array])
    }

    fn read(node: &Arc<TypeTreeNode>, data: &[u8]) -> Result<(Value, u64)> {
        let mut reader = ValueReader::new(data, 0, Endian::Little, IdWidth::Wide);
        let value = reader.read_value(node)?;
        Ok((value, reader.position()))
    }

    #[test]
    fn record_fields_in_declaration_order() -> Result<()> {
        let schema = node(
            "Thing",
            "Base",
            -1,
            vec![
                node("int", "m_B", 4, vec![]),
                node("int", "m_A", 4, vec![]),
                vector("m_Data", node("UInt8", "data", 1, vec![])),
            ],
        );
        #[rustfmt::skip]
        let data = [
            0x01, 0x00, 0x00, 0x00,
            0xFE, 0xFF, 0xFF, 0xFF,
            0x03, 0x00, 0x00, 0x00,
            0x0A, 0x0B, 0x0C, 0x00,
        ];

        let (value, end) = read(&schema, &data)?;
        let record = value.as_record().expect("record");
        assert_eq!(record.field_names().collect::<Vec<_>>(), vec!["m_B", "m_A", "m_Data"]);
        assert_eq!(record.get("m_B"), Some(&Value::I32(1)));
        assert_eq!(record.get("m_A"), Some(&Value::I32(-2)));
        assert_eq!(record.get("m_Data"), Some(&Value::Bytes(vec![0x0A, 0x0B, 0x0C])));
        assert_eq!(end, 16);

        Ok(())
    }

    #[test]
    fn byte_fast_path_matches_element_path() -> Result<()> {
        let data = [0x10, 0x20, 0x30, 0x40, 0x50];
        let element = node("UInt8", "data", 1, vec![]);

        let mut fast = ValueReader::new(&data, 0, Endian::Little, IdWidth::Wide);
        let fast = fast.read_byte_run(data.len())?;

        let mut slow = ValueReader::new(&data, 0, Endian::Little, IdWidth::Wide);
        let slow = slow.read_elements(&element, data.len())?;

        assert!(matches!(slow, Value::Array(_)));
        assert_eq!(fast.as_bytes(), slow.as_bytes());
        assert_eq!(fast.as_bytes().as_deref(), Some(&data[..]));

        Ok(())
    }

    #[test]
    fn signed_and_unsigned_byte_vectors_agree() -> Result<()> {
        let mut data = vec![0x04, 0x00, 0x00, 0x00];
        data.extend_from_slice(&[0x01, 0x7F, 0x80, 0xFF]);

        let unsigned = vector("m_Data", node("UInt8", "data", 1, vec![]));
        let signed = vector("m_Data", node("SInt8", "data", 1, vec![]));

        let (fast, fast_end) = read(&unsigned, &data)?;
        let (slow, slow_end) = read(&signed, &data)?;

        assert!(matches!(fast, Value::Bytes(_)));
        assert!(matches!(slow, Value::Array(_)));
        assert_eq!(fast.as_bytes(), slow.as_bytes());
        assert_eq!(fast.as_bytes().as_deref(), Some(&data[4..]));
        assert_eq!(fast_end, slow_end);

        Ok(())
    }

    #[test]
    fn empty_elements_cannot_outnumber_the_input() {
        let schema = vector("m_Items", node("Empty", "data", 0, vec![]));
        let data = [0xFF, 0xFF, 0xFF, 0x7F];

        assert!(matches!(
            read(&schema, &data),
            Err(Error::InvalidLength(i32::MAX))
        ));
    }

    #[test]
    fn element_arrays_recurse() -> Result<()> {
        let schema = vector("m_Values", node("SInt16", "data", 2, vec![]));
        let data = [0x02, 0x00, 0x00, 0x00, 0x01, 0x00, 0xFF, 0xFF];

        let (value, end) = read(&schema, &data)?;
        assert_eq!(value, Value::Array(vec![Value::I16(1), Value::I16(-1)]));
        assert_eq!(end, 8);

        Ok(())
    }

    #[test]
    fn declared_size_must_be_consumed() {
        let schema = node("Wide", "m_Wide", 8, vec![node("int", "m_Only", 4, vec![])]);
        let data = [0u8; 8];

        assert!(matches!(
            read(&schema, &data),
            Err(Error::SizeMismatch { expected: 8, actual: 4, .. })
        ));
    }

    #[test]
    fn strings_align_when_requested() -> Result<()> {
        let chars = vector("Array", node("char", "data", 1, vec![])).children[0].clone();
        assert_eq!(chars.flags, FLAG_ALIGN);
        let schema = node(
            "Named",
            "Base",
            -1,
            vec![
                node("string", "m_Name", -1, vec![chars]),
                node("bool", "m_Enabled", 1, vec![]),
            ],
        );
        #[rustfmt::skip]
        let data = [
            0x02, 0x00, 0x00, 0x00,
            b'h', b'i', 0x00, 0x00,
            0x01,
        ];

        let (value, _) = read(&schema, &data)?;
        let record = value.as_record().expect("record");
        assert_eq!(record.name(), Some("hi"));
        assert_eq!(record.get("m_Enabled"), Some(&Value::Bool(true)));

        Ok(())
    }

    #[test]
    fn floats_align_first() -> Result<()> {
        let schema = node(
            "Mixed",
            "Base",
            -1,
            vec![node("UInt8", "m_Tag", 1, vec![]), node("float", "m_Value", 4, vec![])],
        );
        let mut data = vec![0x07, 0x00, 0x00, 0x00];
        data.extend_from_slice(&1.5f32.to_le_bytes());

        let (value, end) = read(&schema, &data)?;
        let record = value.as_record().expect("record");
        assert_eq!(record.get("m_Value").and_then(Value::as_f64), Some(1.5));
        assert_eq!(end, 8);

        Ok(())
    }

    #[test]
    fn pointers_follow_id_width() -> Result<()> {
        let schema = node(
            "PPtr<GameObject>",
            "m_GameObject",
            -1,
            vec![node("int", "m_FileID", 4, vec![]), node("SInt64", "m_PathID", 8, vec![])],
        );
        let data = [0x01, 0x00, 0x00, 0x00, 0x2A, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];

        let mut wide = ValueReader::new(&data, 0, Endian::Little, IdWidth::Wide);
        assert_eq!(
            wide.read_value(&schema)?,
            Value::Pointer(ObjectPointer { file_id: 1, path_id: 42 })
        );

        let mut narrow = ValueReader::new(&data, 0, Endian::Little, IdWidth::Narrow);
        assert_eq!(
            narrow.read_value(&schema)?,
            Value::Pointer(ObjectPointer { file_id: 1, path_id: 42 })
        );
        assert_eq!(narrow.position(), 8);

        Ok(())
    }

    #[test]
    fn pairs_and_maps() -> Result<()> {
        let pair = node(
            "pair",
            "data",
            -1,
            vec![node("int", "first", 4, vec![]), node("bool", "second", 1, vec![])],
        );
        let schema = vector("m_Map", pair);
        #[rustfmt::skip]
        let data = [
            0x01, 0x00, 0x00, 0x00,
            0x05, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ];

        let (value, end) = read(&schema, &data)?;
        let items = value.as_array().expect("array");
        assert_eq!(items[0].as_pair(), Some((&Value::I32(5), &Value::Bool(false))));
        assert_eq!(end, 12);

        Ok(())
    }

    #[test]
    fn negative_lengths_are_rejected() {
        let schema = node("string", "m_Name", -1, vec![]);
        let data = [0xFF, 0xFF, 0xFF, 0xFF];
        assert!(matches!(read(&schema, &data), Err(Error::InvalidLength(-1))));
    }
}
