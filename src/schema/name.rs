// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::error::Details;
use crate::{AvroResult, Error};
use regex_lite::Regex;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::OnceLock;

const NAME_REGEX: &str = r"^(?:(?P<namespace>(?:[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)?)\.)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)$";
const NAMESPACE_REGEX: &str = r"^(?:[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*)*)?$";
const SIMPLE_NAME_REGEX: &str = r"^[A-Za-z_][A-Za-z0-9_]*$";

fn name_regex() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(NAME_REGEX).unwrap())
}

fn namespace_regex() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(NAMESPACE_REGEX).unwrap())
}

fn simple_name_regex() -> &'static Regex {
    static ONCE: OnceLock<Regex> = OnceLock::new();
    ONCE.get_or_init(|| Regex::new(SIMPLE_NAME_REGEX).unwrap())
}

/// Split a possibly dotted name into `(base, namespace)` on the last dot.
pub(crate) fn validate_schema_name(schema_name: &str) -> AvroResult<(&str, Option<&str>)> {
    let caps = name_regex()
        .captures(schema_name)
        .ok_or_else(|| Details::InvalidSchemaName(schema_name.to_string(), NAME_REGEX))?;
    let name = caps.name("name").unwrap().as_str();
    let namespace = caps
        .name("namespace")
        .map(|m| m.as_str())
        .filter(|ns| !ns.is_empty());
    Ok((name, namespace))
}

pub(crate) fn validate_namespace(ns: &str) -> AvroResult<()> {
    if namespace_regex().is_match(ns) {
        Ok(())
    } else {
        Err(Details::InvalidNamespace(ns.to_string(), NAMESPACE_REGEX).into())
    }
}

pub(crate) fn validate_enum_symbol_name(symbol: &str) -> AvroResult<()> {
    if simple_name_regex().is_match(symbol) {
        Ok(())
    } else {
        Err(Details::EnumSymbolName(symbol.to_string()).into())
    }
}

pub(crate) fn validate_record_field_name(field_name: &str) -> AvroResult<()> {
    if simple_name_regex().is_match(field_name) {
        Ok(())
    } else {
        Err(Details::FieldName(field_name.to_string()).into())
    }
}

/// Represents names for `record`, `enum` and `fixed` Avro schemas.
///
/// Each of these `Schema`s has a `fullname` composed of two parts:
///   * a name
///   * a namespace
///
/// `aliases` can also be defined to facilitate schema evolution.
///
/// More information about schema names can be found in the
/// [Avro specification](https://avro.apache.org/docs/++version++/specification/#names)
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    /// Create a new `Name`, parsing the optional namespace from the dotted
    /// `name` string.
    pub fn new(name: &str) -> AvroResult<Self> {
        Self::new_with_enclosing_namespace(name, None)
    }

    /// Create a new `Name` using the namespace from `enclosing_namespace` if
    /// `name` itself carries none.
    pub fn new_with_enclosing_namespace(
        name: &str,
        enclosing_namespace: Option<&str>,
    ) -> AvroResult<Self> {
        let (base, namespace) = validate_schema_name(name)?;
        let namespace = match namespace {
            Some(ns) => Some(ns.to_string()),
            None => match enclosing_namespace {
                Some(ns) if !ns.is_empty() => {
                    validate_namespace(ns)?;
                    Some(ns.to_string())
                }
                _ => None,
            },
        };
        Ok(Self {
            name: base.to_string(),
            namespace,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Return the `fullname` of this `Name`, qualified by
    /// `enclosing_namespace` when the name has no namespace of its own.
    pub fn fullname(&self, enclosing_namespace: Option<&str>) -> String {
        match self.namespace.as_deref().or(enclosing_namespace) {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }
}

impl TryFrom<&str> for Name {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl FromStr for Name {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname(None))
    }
}

/// Newtype over [`Name`] for schema aliases. Aliases are serialized as plain
/// strings in the JSON representation and may be simple or fully qualified.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Alias(Name);

impl Alias {
    pub fn new(name: &str) -> AvroResult<Self> {
        Name::new(name).map(Self)
    }

    pub fn name(&self) -> &str {
        self.0.name()
    }

    pub fn namespace(&self) -> Option<&str> {
        self.0.namespace()
    }

    /// The fullname of the alias; an unqualified alias inherits the enclosing
    /// namespace of the type that declares it.
    pub fn fullname(&self, enclosing_namespace: Option<&str>) -> String {
        self.0.fullname(enclosing_namespace)
    }
}

impl TryFrom<&str> for Alias {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}
