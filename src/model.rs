//! Service model: operations and the named shapes describing their input
//! and output.
//!
//! Shapes reference each other by name, which keeps recursive shapes
//! expressible. The model is read-only once loaded.

use crate::error::{Result, StubError};
use crate::protocol::ProtocolFamily;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// A service catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceModel {
    pub metadata: ServiceMetadata,

    #[serde(default)]
    pub operations: BTreeMap<String, OperationModel>,

    #[serde(default)]
    pub shapes: BTreeMap<String, Shape>,
}

/// Service-wide metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceMetadata {
    pub service_id: String,

    /// Protocol family name (`json`, `rest-json`, `rest-xml`, `query`, `ec2`)
    pub protocol: String,

    /// JSON protocol version, used for the `Content-Type` of json responses
    #[serde(default)]
    pub json_version: Option<String>,

    /// XML namespace for xml-based responses
    #[serde(default)]
    pub xml_namespace: Option<String>,
}

/// A single operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationModel {
    #[serde(default)]
    pub input: Option<String>,

    /// Output shape; `None` for operations that return no data
    #[serde(default)]
    pub output: Option<String>,

    #[serde(default)]
    pub errors: Vec<String>,

    #[serde(default)]
    pub paginator: Option<Paginator>,
}

/// Pagination settings of an operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Paginator {
    /// Dotted paths of the output members holding the next-page token
    #[serde(default)]
    pub output_token: Vec<String>,
}

/// Schema node.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Shape {
    Structure {
        #[serde(default)]
        members: BTreeMap<String, MemberRef>,
        #[serde(default)]
        required: BTreeSet<String>,
    },
    List {
        member: MemberRef,
    },
    Map {
        key: MemberRef,
        value: MemberRef,
    },
    String,
    Integer,
    Long,
    Float,
    Double,
    Boolean,
    Timestamp,
    Blob,
}

/// Scalar kinds, as far as placeholder generation and wire coercion care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Integer,
    Float,
    Boolean,
    Timestamp,
    Blob,
}

impl Shape {
    /// The scalar kind, or `None` for aggregate shapes.
    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self {
            Shape::String => Some(ScalarKind::String),
            Shape::Integer | Shape::Long => Some(ScalarKind::Integer),
            Shape::Float | Shape::Double => Some(ScalarKind::Float),
            Shape::Boolean => Some(ScalarKind::Boolean),
            Shape::Timestamp => Some(ScalarKind::Timestamp),
            Shape::Blob => Some(ScalarKind::Blob),
            Shape::Structure { .. } | Shape::List { .. } | Shape::Map { .. } => None,
        }
    }

    pub fn is_structure(&self) -> bool {
        matches!(self, Shape::Structure { .. })
    }
}

/// Reference from a structure, list or map to a member shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberRef {
    pub shape: String,

    #[serde(default)]
    pub location: Location,

    /// Wire name, when it differs from the member name
    #[serde(default)]
    pub location_name: Option<String>,
}

impl MemberRef {
    /// Name used on the wire for this member.
    pub fn wire_name<'a>(&'a self, member_name: &'a str) -> &'a str {
        self.location_name.as_deref().unwrap_or(member_name)
    }
}

/// Where a member is carried in an HTTP response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    #[default]
    Body,
    Header,
    StatusCode,
}

impl ServiceModel {
    /// Load a model from a YAML file.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let model: Self = serde_yaml::from_str(&content)?;
        model.validate()?;
        Ok(model)
    }

    /// Parse a model from a YAML string.
    pub fn from_yaml(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(yaml)
    }

    /// Check that every shape reference resolves.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, op) in &self.operations {
            for shape in op.input.iter().chain(op.output.iter()) {
                if !self.shapes.contains_key(shape) {
                    anyhow::bail!("Operation {}: unknown shape {}", name, shape);
                }
            }
        }
        for (name, shape) in &self.shapes {
            let refs: Vec<&MemberRef> = match shape {
                Shape::Structure { members, required } => {
                    if let Some(missing) = required.iter().find(|r| !members.contains_key(*r)) {
                        anyhow::bail!("Shape {}: required member {} is not declared", name, missing);
                    }
                    members.values().collect()
                }
                Shape::List { member } => vec![member],
                Shape::Map { key, value } => vec![key, value],
                _ => Vec::new(),
            };
            for member in refs {
                if !self.shapes.contains_key(&member.shape) {
                    anyhow::bail!("Shape {}: unknown shape {}", name, member.shape);
                }
            }
        }
        Ok(())
    }

    pub fn operation(&self, name: &str) -> Result<&OperationModel> {
        self.operations
            .get(name)
            .ok_or_else(|| StubError::UnknownOperation(name.to_string()))
    }

    pub fn shape(&self, name: &str) -> Result<&Shape> {
        self.shapes
            .get(name)
            .ok_or_else(|| StubError::UnknownShape(name.to_string()))
    }

    /// The protocol family this service speaks.
    pub fn protocol(&self) -> Result<ProtocolFamily> {
        self.metadata.protocol.parse()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Shared fixture: a small rest-xml object store.
    pub(crate) const STORAGE_MODEL: &str = r#"
metadata:
  service_id: Storage
  protocol: rest-xml
operations:
  HeadObject:
    input: HeadObjectRequest
    output: HeadObjectOutput
    errors: [NotFound]
  ListBuckets:
    output: ListBucketsOutput
  ListObjects:
    input: ListObjectsRequest
    output: ListObjectsOutput
    paginator:
      output_token: [NextMarker]
  DeleteBucket:
    input: DeleteBucketRequest
  GetReport:
    output: GetReportOutput
shapes:
  HeadObjectRequest:
    type: structure
    required: [Bucket, Key]
    members:
      Bucket: { shape: BucketName }
      Key: { shape: ObjectKey }
  HeadObjectOutput:
    type: structure
    members:
      content_length:
        shape: Size
        location: header
        location_name: Content-Length
      ETag: { shape: ETag, location: header }
      LastModified: { shape: Timestamp }
      Metadata: { shape: Metadata }
  ListBucketsOutput:
    type: structure
    members:
      Buckets: { shape: BucketList }
      Owner: { shape: Owner }
  ListObjectsRequest:
    type: structure
    required: [Bucket]
    members:
      Bucket: { shape: BucketName }
      Marker: { shape: Marker }
  ListObjectsOutput:
    type: structure
    members:
      Contents: { shape: ObjectList }
      IsTruncated: { shape: Flag }
      NextMarker: { shape: Marker }
  DeleteBucketRequest:
    type: structure
    required: [Bucket]
    members:
      Bucket: { shape: BucketName }
  GetReportOutput:
    type: structure
    required: [Summary]
    members:
      Summary: { shape: Summary }
      Details: { shape: Owner }
  Summary:
    type: structure
    required: [Owner]
    members:
      Title: { shape: Title }
      Count: { shape: Size }
      Ratio: { shape: Ratio }
      Ready: { shape: Flag }
      Owner: { shape: Owner }
  Owner:
    type: structure
    members:
      DisplayName: { shape: DisplayName }
      ID: { shape: OwnerId }
  Bucket:
    type: structure
    members:
      Name: { shape: BucketName }
      CreationDate: { shape: Timestamp }
  BucketList:
    type: list
    member: { shape: Bucket, location_name: Bucket }
  Object:
    type: structure
    members:
      Key: { shape: ObjectKey }
      Size: { shape: Size }
  ObjectList:
    type: list
    member: { shape: Object }
  Metadata:
    type: map
    key: { shape: MetadataKey }
    value: { shape: MetadataValue }
  BucketName: { type: string }
  ObjectKey: { type: string }
  ETag: { type: string }
  Marker: { type: string }
  Title: { type: string }
  DisplayName: { type: string }
  OwnerId: { type: string }
  MetadataKey: { type: string }
  MetadataValue: { type: string }
  Size: { type: long }
  Ratio: { type: double }
  Flag: { type: boolean }
  Timestamp: { type: timestamp }
"#;

    pub(crate) fn storage_model() -> ServiceModel {
        ServiceModel::from_yaml(STORAGE_MODEL).unwrap()
    }

    #[test]
    fn test_parse_model() {
        let model = storage_model();
        model.validate().unwrap();
        assert_eq!(model.metadata.service_id, "Storage");
        assert_eq!(model.protocol().unwrap(), ProtocolFamily::RestXml);
        assert!(model.operation("DeleteBucket").unwrap().output.is_none());

        match model.shape("HeadObjectOutput").unwrap() {
            Shape::Structure { members, .. } => {
                let len = &members["content_length"];
                assert_eq!(len.location, Location::Header);
                assert_eq!(len.wire_name("content_length"), "Content-Length");
            }
            other => panic!("Expected structure, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_kinds() {
        let model = storage_model();
        assert_eq!(model.shape("Size").unwrap().scalar_kind(), Some(ScalarKind::Integer));
        assert_eq!(model.shape("Ratio").unwrap().scalar_kind(), Some(ScalarKind::Float));
        assert_eq!(model.shape("BucketList").unwrap().scalar_kind(), None);
    }

    #[test]
    fn test_unknown_lookups() {
        let model = storage_model();
        assert!(matches!(
            model.operation("Nope"),
            Err(StubError::UnknownOperation(_))
        ));
        assert!(matches!(model.shape("Nope"), Err(StubError::UnknownShape(_))));
    }

    #[test]
    fn test_validate_rejects_dangling_reference() {
        let yaml = r#"
metadata:
  service_id: Broken
  protocol: json
operations:
  Get:
    output: Missing
"#;
        let model = ServiceModel::from_yaml(yaml).unwrap();
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_undeclared_required() {
        let yaml = r#"
metadata:
  service_id: Broken
  protocol: json
shapes:
  Out:
    type: structure
    required: [Ghost]
    members:
      Name: { shape: Name }
  Name: { type: string }
"#;
        let model = ServiceModel::from_yaml(yaml).unwrap();
        let err = model.validate().unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.yaml");
        std::fs::write(&path, STORAGE_MODEL).unwrap();

        let model = ServiceModel::from_file(&path).unwrap();
        assert!(model.operations.contains_key("HeadObject"));
    }
}
