//! Scripted in-memory browser used by unit tests.
//!
//! A `FakeDriver` walks through a list of `FakePage`s. Each page declares which
//! locators are present, which ones fail hard, the texts behind them and the
//! required form fields it shows. Clicking a locator registered with
//! `advancing_on` moves to the next page (the last page repeats).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{BrowserDriver, DriverError, ElementHandle, Locator};

#[derive(Debug, Clone)]
pub struct FakeField {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct FakeRadioGroup {
    pub label: String,
    pub options: Vec<String>,
    pub selected: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct FakePage {
    present: HashSet<&'static str>,
    failing: HashSet<&'static str>,
    texts: HashMap<&'static str, String>,
    attributes: HashMap<(&'static str, &'static str), String>,
    lists: HashMap<&'static str, usize>,
    url: Option<String>,
    pub text_fields: Vec<FakeField>,
    pub radio_groups: Vec<FakeRadioGroup>,
}

impl FakePage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, locator: Locator) -> Self {
        self.present.insert(locator.value());
        self
    }

    pub fn failing(mut self, locator: Locator) -> Self {
        self.failing.insert(locator.value());
        self
    }

    pub fn with_text(mut self, locator: Locator, text: &str) -> Self {
        self.present.insert(locator.value());
        self.texts.insert(locator.value(), text.to_string());
        self
    }

    pub fn with_attribute(mut self, locator: Locator, name: &'static str, value: &str) -> Self {
        self.present.insert(locator.value());
        self.attributes
            .insert((locator.value(), name), value.to_string());
        self
    }

    pub fn with_list(mut self, locator: Locator, count: usize) -> Self {
        self.lists.insert(locator.value(), count);
        self
    }

    pub fn at_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn with_text_field(mut self, label: &str, value: &str) -> Self {
        self.text_fields.push(FakeField {
            label: label.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn with_radio_group(mut self, label: &str, options: &[&str]) -> Self {
        self.radio_groups.push(FakeRadioGroup {
            label: label.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            selected: None,
        });
        self
    }
}

#[derive(Debug, Default)]
struct FormLocators {
    text_fields: &'static str,
    radio_groups: &'static str,
    radio_option: &'static str,
}

#[derive(Debug, Default)]
struct FakeState {
    pages: Vec<FakePage>,
    current: usize,
    advance_on: HashSet<&'static str>,
    form: FormLocators,
    navigated_to: Option<String>,
    actions: Vec<String>,
    quit: bool,
}

enum Handle {
    Field(usize),
    Group(usize),
    Option(usize, usize),
    Plain(String),
}

fn parse_handle(element: &ElementHandle) -> Handle {
    let id = element.id();
    if let Some(i) = id.strip_prefix("field:").and_then(|i| i.parse().ok()) {
        return Handle::Field(i);
    }
    if let Some(rest) = id.strip_prefix("group:") {
        if let Some((g, o)) = rest.split_once(":option:") {
            if let (Ok(g), Ok(o)) = (g.parse(), o.parse()) {
                return Handle::Option(g, o);
            }
        }
        if let Ok(g) = rest.parse() {
            return Handle::Group(g);
        }
    }
    Handle::Plain(id.to_string())
}

pub struct FakeDriver {
    state: Mutex<FakeState>,
}

impl FakeDriver {
    pub fn new(pages: Vec<FakePage>) -> Self {
        let pages = if pages.is_empty() {
            vec![FakePage::new()]
        } else {
            pages
        };
        Self {
            state: Mutex::new(FakeState {
                pages,
                ..Default::default()
            }),
        }
    }

    /// Clicking `locator` moves to the next page.
    pub fn advancing_on(self, locator: Locator) -> Self {
        self.state.lock().unwrap().advance_on.insert(locator.value());
        self
    }

    /// Tells the fake which locators address required fields.
    pub fn with_form_locators(
        self,
        text_fields: Locator,
        radio_groups: Locator,
        radio_option: Locator,
    ) -> Self {
        self.state.lock().unwrap().form = FormLocators {
            text_fields: text_fields.value(),
            radio_groups: radio_groups.value(),
            radio_option: radio_option.value(),
        };
        self
    }

    pub fn actions(&self) -> Vec<String> {
        self.state.lock().unwrap().actions.clone()
    }

    pub fn clicked(&self, locator: Locator) -> bool {
        let needle = format!("click:{}", locator.value());
        self.actions().iter().any(|a| *a == needle)
    }

    pub fn current_page(&self) -> usize {
        self.state.lock().unwrap().current
    }

    pub fn page(&self, index: usize) -> FakePage {
        self.state.lock().unwrap().pages[index].clone()
    }

    pub fn is_quit(&self) -> bool {
        self.state.lock().unwrap().quit
    }

    fn record(&self, action: String) {
        self.state.lock().unwrap().actions.push(action);
    }
}

fn hard_failure(locator: &str) -> DriverError {
    DriverError::Protocol {
        error: "unknown error".to_string(),
        message: format!("scripted failure on {locator}"),
    }
}

#[async_trait]
impl BrowserDriver for FakeDriver {
    async fn navigate(&self, url: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.navigated_to = Some(url.to_string());
        state.actions.push(format!("navigate:{url}"));
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state.pages[state.current]
            .url
            .clone()
            .or_else(|| state.navigated_to.clone())
            .unwrap_or_else(|| "about:blank".to_string()))
    }

    async fn find(&self, locator: Locator) -> Result<ElementHandle, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        if page.failing.contains(locator.value()) {
            return Err(hard_failure(locator.value()));
        }
        if page.present.contains(locator.value()) {
            return Ok(ElementHandle(locator.value().to_string()));
        }
        Err(DriverError::NoSuchElement(locator.value().to_string()))
    }

    async fn find_all(&self, locator: Locator) -> Result<Vec<ElementHandle>, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        let value = locator.value();
        if page.failing.contains(value) {
            return Err(hard_failure(value));
        }
        if value == state.form.text_fields {
            return Ok((0..page.text_fields.len())
                .map(|i| ElementHandle(format!("field:{i}")))
                .collect());
        }
        if value == state.form.radio_groups {
            return Ok((0..page.radio_groups.len())
                .map(|i| ElementHandle(format!("group:{i}")))
                .collect());
        }
        if let Some(count) = page.lists.get(value) {
            return Ok((0..*count)
                .map(|i| ElementHandle(format!("{value}#{i}")))
                .collect());
        }
        if page.present.contains(value) {
            return Ok(vec![ElementHandle(value.to_string())]);
        }
        Ok(Vec::new())
    }

    async fn find_in(
        &self,
        parent: &ElementHandle,
        locator: Locator,
    ) -> Result<Vec<ElementHandle>, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        match parse_handle(parent) {
            Handle::Group(g) if locator.value() == state.form.radio_option => {
                let count = page.radio_groups.get(g).map(|r| r.options.len()).unwrap_or(0);
                Ok((0..count)
                    .map(|o| ElementHandle(format!("group:{g}:option:{o}")))
                    .collect())
            }
            // Plain elements do not scope their children: anything on the page matches.
            Handle::Plain(_) if page.present.contains(locator.value()) => {
                Ok(vec![ElementHandle(locator.value().to_string())])
            }
            _ => Ok(Vec::new()),
        }
    }

    async fn is_displayed(&self, _element: &ElementHandle) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn is_enabled(&self, _element: &ElementHandle) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn is_selected(&self, element: &ElementHandle) -> Result<bool, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        Ok(match parse_handle(element) {
            Handle::Option(g, o) => page.radio_groups.get(g).and_then(|r| r.selected) == Some(o),
            _ => false,
        })
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("click:{}", element.id()));
        let current = state.current;
        match parse_handle(element) {
            Handle::Option(g, o) => {
                if let Some(group) = state.pages[current].radio_groups.get_mut(g) {
                    group.selected = Some(o);
                }
            }
            Handle::Plain(id) if state.advance_on.contains(id.as_str()) => {
                if state.current + 1 < state.pages.len() {
                    state.current += 1;
                }
            }
            _ => {}
        }
        Ok(())
    }

    async fn send_keys(&self, element: &ElementHandle, text: &str) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.actions.push(format!("keys:{}:{text}", element.id()));
        let current = state.current;
        if let Handle::Field(i) = parse_handle(element) {
            if let Some(field) = state.pages[current].text_fields.get_mut(i) {
                field.value = text.to_string();
            }
        }
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> Result<String, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        Ok(match parse_handle(element) {
            Handle::Field(i) => page.text_fields.get(i).map(|f| f.label.clone()),
            Handle::Group(g) => page.radio_groups.get(g).map(|r| r.label.clone()),
            Handle::Option(g, o) => page
                .radio_groups
                .get(g)
                .and_then(|r| r.options.get(o).cloned()),
            Handle::Plain(id) => page.texts.get(id.as_str()).cloned(),
        }
        .unwrap_or_default())
    }

    async fn attribute(
        &self,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>, DriverError> {
        let state = self.state.lock().unwrap();
        let page = &state.pages[state.current];
        Ok(match (parse_handle(element), name) {
            (Handle::Field(i), "value") => page.text_fields.get(i).map(|f| f.value.clone()),
            (Handle::Field(i), "aria-label") => page.text_fields.get(i).map(|f| f.label.clone()),
            (Handle::Option(g, o), "value") => page
                .radio_groups
                .get(g)
                .and_then(|r| r.options.get(o).cloned()),
            (Handle::Plain(id), _) => page
                .attributes
                .iter()
                .find(|((loc, attr), _)| *loc == id.as_str() && *attr == name)
                .map(|(_, v)| v.clone()),
            _ => None,
        })
    }

    async fn execute_script(&self, _script: &str) -> Result<Value, DriverError> {
        Ok(json!(1000))
    }

    async fn enter_frame(&self, frame: &ElementHandle) -> Result<(), DriverError> {
        self.record(format!("enter_frame:{}", frame.id()));
        Ok(())
    }

    async fn leave_frames(&self) -> Result<(), DriverError> {
        self.record("leave_frames".to_string());
        Ok(())
    }

    async fn quit(&self) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.quit = true;
        state.actions.push("quit".to_string());
        Ok(())
    }

    async fn upload(&self, input: &ElementHandle, path: &Path) -> Result<(), DriverError> {
        self.record(format!("upload:{}:{}", input.id(), path.display()));
        Ok(())
    }
}
