//! Standard security handler
//!
//! Reads documents encrypted with revisions 2-4 (RC4 or AES-128) and writes
//! revision 3 (128-bit RC4) with owner/user passwords and permission flags.

mod rc4;
mod standard;

use aes::cipher::{block_padding::Pkcs7, BlockDecryptMut, KeyIvInit};
use lopdf::{dictionary, Dictionary, Object, ObjectId, StringFormat};
use serde::{Deserialize, Serialize};

use crate::error::{PdfToolsError, Result};
use standard::HandlerParams;

type Aes128CbcDec = cbc::Decryptor<aes::Aes128>;

/// Revision written by `encrypt_document`
const WRITE_REVISION: u32 = 3;
const WRITE_KEY_LENGTH: usize = 16;

/// Bits 7-8 and 13-32 of /P must be set
const RESERVED_PERMISSION_BITS: u32 = 0xFFFF_F0C0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PrintPermission {
    None,
    LowResolution,
    #[default]
    HighResolution,
}

/// Capabilities granted to users who open the document with the user password
///
/// The default denies everything except high-resolution printing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub printing: PrintPermission,
    pub modifying: bool,
    pub copying: bool,
    pub annotating: bool,
    pub filling_forms: bool,
    pub content_accessibility: bool,
    pub document_assembly: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            printing: PrintPermission::HighResolution,
            modifying: false,
            copying: false,
            annotating: false,
            filling_forms: false,
            content_accessibility: false,
            document_assembly: false,
        }
    }
}

impl Permissions {
    /// The /P value
    pub fn to_flags(&self) -> i32 {
        let mut flags = RESERVED_PERMISSION_BITS;
        let mut grant = |allowed: bool, bit: u32| {
            if allowed {
                flags |= 1 << (bit - 1);
            }
        };

        grant(self.printing != PrintPermission::None, 3);
        grant(self.modifying, 4);
        grant(self.copying, 5);
        grant(self.annotating, 6);
        grant(self.filling_forms, 9);
        grant(self.content_accessibility, 10);
        grant(self.document_assembly, 11);
        grant(self.printing == PrintPermission::HighResolution, 12);

        flags as i32
    }

    pub fn from_flags(flags: i32) -> Self {
        let has = |bit: u32| (flags as u32) & (1 << (bit - 1)) != 0;
        let printing = match (has(3), has(12)) {
            (false, _) => PrintPermission::None,
            (true, false) => PrintPermission::LowResolution,
            (true, true) => PrintPermission::HighResolution,
        };
        Self {
            printing,
            modifying: has(4),
            copying: has(5),
            annotating: has(6),
            filling_forms: has(9),
            content_accessibility: has(10),
            document_assembly: has(11),
        }
    }
}

/// Passwords and permissions applied when a document is saved
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionSettings {
    pub user_password: String,
    pub owner_password: String,
    pub permissions: Permissions,
}

impl std::fmt::Debug for EncryptionSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSettings")
            .field("user_password", &"***")
            .field("owner_password", &"***")
            .field("permissions", &self.permissions)
            .finish()
    }
}

impl EncryptionSettings {
    /// Same password for owner and user, default permissions
    pub fn with_password(password: impl Into<String>) -> Self {
        let password = password.into();
        Self {
            owner_password: password.clone(),
            user_password: password,
            permissions: Permissions::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CryptMethod {
    Identity,
    Rc4,
    Aes128,
}

struct Cipher {
    file_key: Vec<u8>,
    strings: CryptMethod,
    streams: CryptMethod,
    encrypt_metadata: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl Cipher {
    fn apply(&self, method: CryptMethod, id: ObjectId, data: &[u8], direction: Direction) -> Result<Vec<u8>> {
        match method {
            CryptMethod::Identity => Ok(data.to_vec()),
            CryptMethod::Rc4 => {
                let key = standard::object_key(&self.file_key, id, false);
                Ok(rc4::rc4_crypt(&key, data))
            }
            CryptMethod::Aes128 => match direction {
                Direction::Decrypt => aes_decrypt(&standard::object_key(&self.file_key, id, true), data),
                Direction::Encrypt => Err(PdfToolsError::UnsupportedEncryption(
                    "AES output is not supported".into(),
                )),
            },
        }
    }

    fn transform_object(&self, id: ObjectId, object: &mut Object, direction: Direction) -> Result<()> {
        match object {
            Object::Stream(stream) => {
                if is_type(&stream.dict, b"XRef") {
                    return Ok(());
                }
                self.transform_strings_in_dict(id, &mut stream.dict, direction)?;
                if !self.encrypt_metadata && is_type(&stream.dict, b"Metadata") {
                    return Ok(());
                }
                let content = self.apply(self.streams, id, &stream.content, direction)?;
                stream.set_content(content);
                Ok(())
            }
            other => self.transform_strings(id, other, direction),
        }
    }

    fn transform_strings(&self, id: ObjectId, object: &mut Object, direction: Direction) -> Result<()> {
        match object {
            Object::String(bytes, format) => {
                let transformed = self.apply(self.strings, id, bytes, direction)?;
                *format = preferred_format(&transformed, direction);
                *bytes = transformed;
                Ok(())
            }
            Object::Array(items) => items
                .iter_mut()
                .try_for_each(|item| self.transform_strings(id, item, direction)),
            Object::Dictionary(dict) => self.transform_strings_in_dict(id, dict, direction),
            _ => Ok(()),
        }
    }

    fn transform_strings_in_dict(&self, id: ObjectId, dict: &mut Dictionary, direction: Direction) -> Result<()> {
        dict.iter_mut()
            .try_for_each(|(_, value)| self.transform_strings(id, value, direction))
    }
}

/// Ciphertext is written as hex; plaintext keeps literal form only when printable
fn preferred_format(bytes: &[u8], direction: Direction) -> StringFormat {
    let printable = bytes.iter().all(|b| (0x20..0x7F).contains(b));
    if direction == Direction::Decrypt && printable {
        StringFormat::Literal
    } else {
        StringFormat::Hexadecimal
    }
}

fn aes_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < 16 {
        return Ok(Vec::new());
    }
    let (iv, ciphertext) = data.split_at(16);
    let mut buffer = ciphertext.to_vec();
    let decryptor = Aes128CbcDec::new_from_slices(key, iv)
        .map_err(|e| PdfToolsError::CorruptDocument(format!("invalid AES key: {}", e)))?;
    let plain = decryptor
        .decrypt_padded_mut::<Pkcs7>(&mut buffer)
        .map_err(|_| PdfToolsError::CorruptDocument("AES decryption failed".into()))?;
    Ok(plain.to_vec())
}

fn is_type(dict: &Dictionary, name: &[u8]) -> bool {
    matches!(dict.get(b"Type"), Ok(Object::Name(n)) if n.as_slice() == name)
}

fn string_bytes(dict: &Dictionary, key: &[u8]) -> Result<Vec<u8>> {
    match dict.get(key) {
        Ok(Object::String(bytes, _)) => Ok(bytes.clone()),
        _ => Err(PdfToolsError::CorruptDocument(format!(
            "encryption dictionary has no /{}",
            String::from_utf8_lossy(key)
        ))),
    }
}

fn integer(dict: &Dictionary, key: &[u8]) -> Option<i64> {
    match dict.get(key) {
        Ok(Object::Integer(i)) => Some(*i),
        _ => None,
    }
}

fn first_file_id(doc: &lopdf::Document) -> Option<Vec<u8>> {
    match doc.trailer.get(b"ID") {
        Ok(Object::Array(ids)) => match ids.first() {
            Some(Object::String(bytes, _)) if !bytes.is_empty() => Some(bytes.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn generate_file_id() -> Vec<u8> {
    uuid::Uuid::new_v4().as_bytes().to_vec()
}

/// Crypt filter method named by /StmF or /StrF (V4 dictionaries)
fn filter_method(encrypt: &Dictionary, key: &[u8]) -> Result<CryptMethod> {
    let name = match encrypt.get(key) {
        Ok(Object::Name(name)) => name.clone(),
        _ => return Ok(CryptMethod::Identity),
    };
    if name == b"Identity" {
        return Ok(CryptMethod::Identity);
    }

    let filter = match encrypt.get(b"CF") {
        Ok(Object::Dictionary(filters)) => match filters.get(&name) {
            Ok(Object::Dictionary(filter)) => filter,
            _ => return Err(PdfToolsError::CorruptDocument("missing crypt filter".into())),
        },
        _ => return Err(PdfToolsError::CorruptDocument("missing /CF dictionary".into())),
    };

    match filter.get(b"CFM") {
        Ok(Object::Name(cfm)) if cfm == b"V2" => Ok(CryptMethod::Rc4),
        Ok(Object::Name(cfm)) if cfm == b"AESV2" => Ok(CryptMethod::Aes128),
        Ok(Object::Name(cfm)) if cfm == b"None" => Ok(CryptMethod::Identity),
        Ok(Object::Name(cfm)) => Err(PdfToolsError::UnsupportedEncryption(format!(
            "crypt filter method {}",
            String::from_utf8_lossy(cfm)
        ))),
        _ => Ok(CryptMethod::Identity),
    }
}

/// Decrypt every string and stream in place and drop the encryption dictionary
///
/// `password` may be either the user or the owner password.
pub(crate) fn decrypt_document(doc: &mut lopdf::Document, password: &str) -> Result<()> {
    let (encrypt_id, encrypt) = match doc.trailer.get(b"Encrypt") {
        Ok(Object::Reference(id)) => {
            let dict = doc
                .get_dictionary(*id)
                .map_err(|e| PdfToolsError::CorruptDocument(format!("bad /Encrypt: {}", e)))?
                .clone();
            (Some(*id), dict)
        }
        Ok(Object::Dictionary(dict)) => (None, dict.clone()),
        _ => return Err(PdfToolsError::CorruptDocument("bad /Encrypt entry".into())),
    };

    match encrypt.get(b"Filter") {
        Ok(Object::Name(filter)) if filter == b"Standard" => {}
        _ => {
            return Err(PdfToolsError::UnsupportedEncryption(
                "only the standard security handler is supported".into(),
            ))
        }
    }

    let version = integer(&encrypt, b"V").unwrap_or(0);
    let revision = integer(&encrypt, b"R").unwrap_or(0) as u32;
    if !(2..=4).contains(&revision) || !matches!(version, 1 | 2 | 4) {
        return Err(PdfToolsError::UnsupportedEncryption(format!(
            "security handler V{} R{}",
            version, revision
        )));
    }

    let (key_length, strings, streams) = match version {
        1 => (5, CryptMethod::Rc4, CryptMethod::Rc4),
        2 => {
            let bits = integer(&encrypt, b"Length").unwrap_or(40);
            ((bits / 8).clamp(5, 16) as usize, CryptMethod::Rc4, CryptMethod::Rc4)
        }
        _ => (
            16,
            filter_method(&encrypt, b"StrF")?,
            filter_method(&encrypt, b"StmF")?,
        ),
    };

    let encrypt_metadata = !matches!(encrypt.get(b"EncryptMetadata"), Ok(Object::Boolean(false)));
    let params = HandlerParams {
        revision,
        key_length,
        owner_hash: string_bytes(&encrypt, b"O")?,
        user_hash: string_bytes(&encrypt, b"U")?,
        permissions: integer(&encrypt, b"P").unwrap_or(0) as i32,
        file_id: first_file_id(doc).unwrap_or_default(),
        encrypt_metadata,
    };

    let file_key = standard::authenticate_user(password.as_bytes(), &params)
        .or_else(|| standard::authenticate_owner(password.as_bytes(), &params))
        .ok_or(PdfToolsError::WrongPassword)?;

    let cipher = Cipher {
        file_key,
        strings,
        streams,
        encrypt_metadata,
    };
    for (&id, object) in doc.objects.iter_mut() {
        if Some(id) == encrypt_id {
            continue;
        }
        cipher.transform_object(id, object, Direction::Decrypt)?;
    }

    doc.trailer.remove(b"Encrypt");
    if let Some(id) = encrypt_id {
        doc.objects.remove(&id);
    }
    Ok(())
}

/// Encrypt every string and stream in place and attach an encryption dictionary
pub(crate) fn encrypt_document(doc: &mut lopdf::Document, settings: &EncryptionSettings) -> Result<()> {
    let file_id = first_file_id(doc).unwrap_or_else(generate_file_id);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
            Object::String(file_id.clone(), StringFormat::Hexadecimal),
        ],
    );

    let permissions = settings.permissions.to_flags();
    let owner_hash = standard::owner_hash(
        settings.owner_password.as_bytes(),
        settings.user_password.as_bytes(),
        WRITE_REVISION,
        WRITE_KEY_LENGTH,
    );
    let mut params = HandlerParams {
        revision: WRITE_REVISION,
        key_length: WRITE_KEY_LENGTH,
        owner_hash,
        user_hash: Vec::new(),
        permissions,
        file_id,
        encrypt_metadata: true,
    };
    let file_key = standard::file_key(settings.user_password.as_bytes(), &params);
    params.user_hash = standard::user_hash(&file_key, WRITE_REVISION, &params.file_id);

    let cipher = Cipher {
        file_key,
        strings: CryptMethod::Rc4,
        streams: CryptMethod::Rc4,
        encrypt_metadata: true,
    };
    for (&id, object) in doc.objects.iter_mut() {
        cipher.transform_object(id, object, Direction::Encrypt)?;
    }

    let encrypt_id = doc.add_object(dictionary! {
        "Filter" => "Standard",
        "V" => 2,
        "R" => WRITE_REVISION as i64,
        "Length" => (WRITE_KEY_LENGTH * 8) as i64,
        "P" => permissions as i64,
        "O" => Object::String(params.owner_hash, StringFormat::Hexadecimal),
        "U" => Object::String(params.user_hash, StringFormat::Hexadecimal),
    });
    doc.trailer.set("Encrypt", encrypt_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Document, Stream};

    fn tiny_document() -> Document {
        let mut doc = Document::with_version("1.7");
        let stream_id = doc.add_object(Stream::new(
            Dictionary::new(),
            b"BT /F1 12 Tf (Secret text) Tj ET".to_vec(),
        ));
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal("Quarterly report"),
            "Producer" => Object::string_literal("pdftools"),
        });
        doc.trailer.set("Info", info_id);
        doc.trailer.set("Stream", stream_id);
        doc
    }

    #[test]
    fn test_default_permissions_allow_only_printing() {
        let flags = Permissions::default().to_flags();
        assert_eq!(flags as u32 & 0b1111_1111_1100, (1 << 2) | (1 << 11) | 0xC0);
        let decoded = Permissions::from_flags(flags);
        assert_eq!(decoded, Permissions::default());
    }

    #[test]
    fn test_permission_flags_roundtrip() {
        let permissions = Permissions {
            printing: PrintPermission::LowResolution,
            modifying: true,
            copying: false,
            annotating: true,
            filling_forms: false,
            content_accessibility: true,
            document_assembly: false,
        };
        assert_eq!(Permissions::from_flags(permissions.to_flags()), permissions);
    }

    #[test]
    fn test_encrypt_then_decrypt_restores_content() {
        let mut doc = tiny_document();
        let stream_id = doc.trailer.get(b"Stream").unwrap().as_reference().unwrap();

        encrypt_document(&mut doc, &EncryptionSettings::with_password("hunter2")).unwrap();
        let encrypted = doc.get_object(stream_id).unwrap().as_stream().unwrap();
        assert_ne!(encrypted.content, b"BT /F1 12 Tf (Secret text) Tj ET".to_vec());
        assert!(doc.trailer.has(b"Encrypt"));

        decrypt_document(&mut doc, "hunter2").unwrap();
        let decrypted = doc.get_object(stream_id).unwrap().as_stream().unwrap();
        assert_eq!(decrypted.content, b"BT /F1 12 Tf (Secret text) Tj ET".to_vec());
        assert!(!doc.trailer.has(b"Encrypt"));
    }

    #[test]
    fn test_decrypt_with_wrong_password_fails() {
        let mut doc = tiny_document();
        encrypt_document(&mut doc, &EncryptionSettings::with_password("right")).unwrap();
        let err = decrypt_document(&mut doc, "wrong").unwrap_err();
        assert!(matches!(err, PdfToolsError::WrongPassword));
    }

    #[test]
    fn test_owner_password_decrypts() {
        let mut doc = tiny_document();
        let settings = EncryptionSettings {
            user_password: "reader".into(),
            owner_password: "author".into(),
            permissions: Permissions::default(),
        };
        encrypt_document(&mut doc, &settings).unwrap();
        decrypt_document(&mut doc, "author").unwrap();
        assert!(!doc.trailer.has(b"Encrypt"));
    }

    #[test]
    fn test_settings_debug_hides_passwords() {
        let rendered = format!("{:?}", EncryptionSettings::with_password("topsecret"));
        assert!(!rendered.contains("topsecret"));
    }
}
