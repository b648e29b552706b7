//! Base MARC record model and associated components.
const TAG_LEN: usize = 3;
const LEADER_LEN: usize = 24;
const CODE_LEN: usize = 1;
const DEFAULT_LEADER: &str = "                        ";
const DEFAULT_INDICATOR: &str = " ";

/// Verifies the provided string is composed of 'len' number of bytes.
fn require_byte_count(s: &str, len: usize) -> Result<(), String> {
    let byte_len = s.as_bytes().len();
    if byte_len != len {
        return Err(format!(
            "Invalid byte count for string s={s} wanted={len} found={byte_len}"
        ));
    }
    Ok(())
}

/// MARC control field, i.e. a field whose tag is less than "010".
#[derive(Debug, Clone, PartialEq)]
pub struct Controlfield {
    tag: String,
    content: String,
}

impl Controlfield {
    /// Create a Controlfield with the provided tag and content.
    ///
    /// # Examples
    ///
    /// ```
    /// let cf = marcrec::Controlfield::new("001", "ucla0001").unwrap();
    /// assert_eq!(cf.tag(), "001");
    ///
    /// assert!(marcrec::Controlfield::new("035", "nope").is_err());
    /// ```
    pub fn new(tag: impl Into<String>, content: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into();
        require_byte_count(&tag, TAG_LEN)?;

        if tag.as_str() < "000" || tag.as_str() > "009" {
            return Err(format!("Invalid Controlfield tag: {tag}"));
        }

        Ok(Controlfield {
            tag,
            content: content.into(),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// A single subfield code + value pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Subfield {
    code: String,
    content: String,
}

impl Subfield {
    /// Create a Subfield with the provided code and content.
    ///
    /// The code must be a single byte.
    ///
    /// # Examples
    ///
    /// ```
    /// let sf = marcrec::Subfield::new("u", "http://example.org").unwrap();
    /// assert_eq!(sf.code(), "u");
    ///
    /// assert!(marcrec::Subfield::new("uu", "nope").is_err());
    /// ```
    pub fn new(code: impl Into<String>, content: impl Into<String>) -> Result<Self, String> {
        let code = code.into();
        require_byte_count(&code, CODE_LEN)?;
        Ok(Subfield {
            code,
            content: content.into(),
        })
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }
}

/// A MARC data field with tag, indicators, and subfields.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    tag: String,
    ind1: Option<String>,
    ind2: Option<String>,
    subfields: Vec<Subfield>,
}

impl Field {
    /// Create a Field with the provided tag and no subfields.
    ///
    /// The tag must be 3 bytes.  Tags outside the "010".."999" range
    /// are tolerated, since some vendors produce them.
    pub fn new(tag: impl Into<String>) -> Result<Self, String> {
        let tag = tag.into();
        require_byte_count(&tag, TAG_LEN)?;

        Ok(Field {
            tag,
            ind1: None,
            ind2: None,
            subfields: Vec::new(),
        })
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Value of indicator-1, defaulting to a space.
    pub fn ind1(&self) -> &str {
        self.ind1.as_deref().unwrap_or(DEFAULT_INDICATOR)
    }

    /// Value of indicator-2, defaulting to a space.
    pub fn ind2(&self) -> &str {
        self.ind2.as_deref().unwrap_or(DEFAULT_INDICATOR)
    }

    pub fn set_ind1(&mut self, ind: impl Into<String>) -> Result<(), String> {
        let ind = ind.into();
        require_byte_count(&ind, CODE_LEN)?;
        self.ind1 = Some(ind);
        Ok(())
    }

    pub fn set_ind2(&mut self, ind: impl Into<String>) -> Result<(), String> {
        let ind = ind.into();
        require_byte_count(&ind, CODE_LEN)?;
        self.ind2 = Some(ind);
        Ok(())
    }

    /// Full list of subfields in document order.
    pub fn subfields(&self) -> &Vec<Subfield> {
        &self.subfields
    }

    pub fn subfields_mut(&mut self) -> &mut Vec<Subfield> {
        &mut self.subfields
    }

    /// List of subfields with the provided code, in document order.
    pub fn get_subfields(&self, code: &str) -> Vec<&Subfield> {
        self.subfields.iter().filter(|s| s.code() == code).collect()
    }

    /// First occurrence of the subfield with the provided code, if present.
    ///
    /// # Examples
    ///
    /// ```
    /// use marcrec::Field;
    ///
    /// let mut field = Field::new("856").unwrap();
    /// assert!(field.first_subfield("u").is_none());
    ///
    /// field.add_subfield("u", "http://example.org/one").unwrap();
    /// field.add_subfield("u", "http://example.org/two").unwrap();
    ///
    /// assert_eq!(
    ///     field.first_subfield("u").unwrap().content(),
    ///     "http://example.org/one"
    /// );
    /// ```
    pub fn first_subfield(&self, code: &str) -> Option<&Subfield> {
        self.subfields.iter().find(|s| s.code() == code)
    }

    /// Mutable ref to the first subfield with the provided code.
    pub fn first_subfield_mut(&mut self, code: &str) -> Option<&mut Subfield> {
        self.subfields.iter_mut().find(|s| s.code() == code)
    }

    /// Append a new Subfield created from the provided code and content.
    pub fn add_subfield(
        &mut self,
        code: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<(), String> {
        self.subfields.push(Subfield::new(code, content)?);
        Ok(())
    }
}

/// A MARC record with leader, control fields, and data fields.
///
/// Field order and subfield order are preserved exactly as loaded,
/// so an unmodified record round-trips through the binary codec.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    leader: String,
    control_fields: Vec<Controlfield>,
    fields: Vec<Field>,
}

impl Default for Record {
    fn default() -> Self {
        Self::new()
    }
}

impl Record {
    /// Create a new Record with a default leader and no content.
    pub fn new() -> Self {
        Record {
            leader: DEFAULT_LEADER.to_string(),
            control_fields: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn leader(&self) -> &str {
        &self.leader
    }

    /// Apply a leader value.
    ///
    /// Returns Err if the value is not composed of the correct number
    /// of bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut record = marcrec::Record::default();
    /// assert!(record.set_leader("too short").is_err());
    /// assert!(record.set_leader("00000cam a2200000 a 4500").is_ok());
    /// ```
    pub fn set_leader(&mut self, leader: impl Into<String>) -> Result<(), String> {
        let leader = leader.into();
        require_byte_count(&leader, LEADER_LEN)?;
        self.leader = leader;
        Ok(())
    }

    /// Apply a leader value from a set of bytes.
    pub fn set_leader_bytes(&mut self, bytes: &[u8]) -> Result<(), String> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| format!("Leader is not a valid UTF-8 string: {e} bytes={bytes:?}"))?;
        self.set_leader(s)
    }

    pub fn control_fields(&self) -> &Vec<Controlfield> {
        &self.control_fields
    }

    pub fn control_fields_mut(&mut self) -> &mut Vec<Controlfield> {
        &mut self.control_fields
    }

    pub fn fields(&self) -> &Vec<Field> {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Vec<Field> {
        &mut self.fields
    }

    /// List of data fields with the provided tag.
    pub fn get_fields(&self, tag: &str) -> Vec<&Field> {
        self.fields.iter().filter(|f| f.tag() == tag).collect()
    }

    /// First data field with the provided tag, if present.
    pub fn first_field(&self, tag: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.tag() == tag)
    }

    /// Mutable ref to the first data field with the provided tag.
    pub fn first_field_mut(&mut self, tag: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.tag() == tag)
    }

    /// Add a new control field with the provided tag and content,
    /// inserted in tag order.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut record = marcrec::Record::default();
    /// record.add_control_field("008", "baz").unwrap();
    /// record.add_control_field("001", "bar").unwrap();
    ///
    /// assert_eq!(record.control_fields()[0].tag(), "001");
    /// ```
    pub fn add_control_field(&mut self, tag: &str, content: &str) -> Result<(), String> {
        let field = Controlfield::new(tag, content)?;

        if let Some(idx) = self
            .control_fields
            .iter()
            .position(|f| f.tag() > field.tag())
        {
            self.control_fields.insert(idx, field);
        } else {
            self.control_fields.push(field);
        }

        Ok(())
    }

    /// Create a new Field with the provided tag, insert it into the
    /// record in tag order, then return a mut ref to the new field.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut record = marcrec::Record::default();
    /// record.add_data_field("856").unwrap();
    /// record.add_data_field("035").unwrap();
    ///
    /// assert_eq!(record.fields()[0].tag(), "035");
    /// ```
    pub fn add_data_field(&mut self, tag: impl Into<String>) -> Result<&mut Field, String> {
        let field = Field::new(tag)?;

        let idx = match self.fields.iter().position(|f| f.tag() > field.tag()) {
            Some(idx) => {
                self.fields.insert(idx, field);
                idx
            }
            None => {
                self.fields.push(field);
                self.fields.len() - 1
            }
        };

        Ok(&mut self.fields[idx])
    }

    /// Returns a list of values for the specified tag and subfield.
    ///
    /// # Examples
    ///
    /// ```
    /// let mut record = marcrec::Record::default();
    /// let field = record.add_data_field("035").unwrap();
    /// field.add_subfield("9", "(ZTUCLA)1234").unwrap();
    ///
    /// assert_eq!(record.get_field_values("035", "9"), vec!["(ZTUCLA)1234"]);
    /// ```
    pub fn get_field_values(&self, tag: &str, sfcode: &str) -> Vec<&str> {
        let mut values = Vec::new();
        for field in self.get_fields(tag) {
            for sf in field.get_subfields(sfcode) {
                values.push(sf.content());
            }
        }
        values
    }
}
