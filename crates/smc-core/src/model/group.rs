// Groups: named collections of other elements, stored as member hrefs.

use serde::Serialize;
use serde_json::Value;
use smc_api::{Href, SmcResult};

use crate::element::{Element, Representation};
use crate::error::CoreError;
use crate::model::ElementSpec;
use crate::reference::ElementRef;

#[derive(Debug)]
pub struct Group {
    element: Element,
}

crate::element_type!(Group, ["group"]);

impl Group {
    /// Member references. Members are not fetched.
    pub async fn members(&mut self) -> Result<Vec<ElementRef>, CoreError> {
        self.element.references("element").await
    }

    pub async fn comment(&mut self) -> Result<Option<&str>, CoreError> {
        self.element.get_str("comment").await
    }

    /// Append a member and save. Already-present members are not duplicated.
    pub async fn add_member(&mut self, member: &Href) -> Result<SmcResult, CoreError> {
        let mut members = self.element.get_str_list("element").await?;
        if !members.iter().any(|m| m == member.as_str()) {
            members.push(member.as_str().to_owned());
        }
        self.element.update(member_changes(members)).await
    }

    /// Replace the member list and save.
    pub async fn set_members(&mut self, members: &[ElementRef]) -> Result<SmcResult, CoreError> {
        let hrefs = members.iter().map(|m| m.href().as_str().to_owned()).collect();
        self.element.update(member_changes(hrefs)).await
    }
}

fn member_changes(hrefs: Vec<String>) -> Representation {
    let mut changes = Representation::new();
    changes.insert(
        "element".into(),
        Value::Array(hrefs.into_iter().map(Value::String).collect()),
    );
    changes
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupSpec {
    pub name: String,
    #[serde(rename = "element")]
    pub members: Vec<Href>,
    pub comment: String,
}

impl GroupSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
            comment: String::new(),
        }
    }

    pub fn member(mut self, href: impl Into<Href>) -> Self {
        self.members.push(href.into());
        self
    }
}

impl ElementSpec for GroupSpec {
    const KIND: &'static str = "group";
}
