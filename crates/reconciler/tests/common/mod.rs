//! In-memory stand-in for the management API.
//!
//! Keeps ADOMs, devices and metavariables the way the server reports them and
//! answers with the server's status codes for duplicates, unknown objects and
//! serial collisions. Every call is recorded.

#![allow(dead_code)]

use std::collections::BTreeMap;

use adomsync_jsonrpc::{ApiRequest, Error, RemoteApi, Result, Verb};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;

/// Object already exists.
pub const DUPLICATE: i64 = -2;
/// Object does not exist.
pub const NOT_FOUND: i64 = -3;
/// Serial number registered elsewhere.
pub const SERIAL_IN_USE: i64 = -20042;
/// Code returned by injected failures.
pub const INJECTED: i64 = -1;

#[derive(Debug, Default)]
struct Inventory {
    adoms: Vec<Value>,
    devices: BTreeMap<String, Vec<Value>>,
    variables: BTreeMap<String, Vec<Value>>,
}

impl Inventory {
    fn has_adom(&self, name: &str) -> bool {
        self.adoms
            .iter()
            .any(|a| a.get("name").and_then(Value::as_str) == Some(name))
    }

    fn serial_in_use(&self, serial: &str) -> bool {
        self.devices
            .values()
            .flatten()
            .any(|d| d.get("sn").and_then(Value::as_str) == Some(serial))
    }

    fn variable_mut(&mut self, adom: &str, name: &str) -> Option<&mut Value> {
        self.variables
            .get_mut(adom)?
            .iter_mut()
            .find(|v| v.get("name").and_then(Value::as_str) == Some(name))
    }
}

enum Route<'a> {
    Adoms,
    Adom(&'a str),
    Devices(&'a str),
    AddDevice,
    Variables(&'a str),
    Variable(&'a str, &'a str),
    Mappings(&'a str, &'a str),
    Unknown,
}

fn route(url: &str) -> Route<'_> {
    if url == "/dvmdb/adom" {
        return Route::Adoms;
    }
    if url == "/dvm/cmd/add/device" {
        return Route::AddDevice;
    }
    if let Some(rest) = url.strip_prefix("/dvmdb/adom/") {
        return match rest.split_once('/') {
            None => Route::Adom(rest),
            Some((adom, "device")) => Route::Devices(adom),
            Some(_) => Route::Unknown,
        };
    }
    let Some((adom, tail)) = url
        .strip_prefix("/pm/config/adom/")
        .and_then(|rest| rest.split_once("/obj/fmg/variable"))
    else {
        return Route::Unknown;
    };
    if tail.is_empty() {
        return Route::Variables(adom);
    }
    match tail.strip_prefix('/') {
        Some(name) => match name.strip_suffix("/dynamic_mapping") {
            Some(name) => Route::Mappings(adom, name),
            None => Route::Variable(adom, name),
        },
        None => Route::Unknown,
    }
}

fn same_scope(mapping: &Value, device: &str, vdom: &str) -> bool {
    mapping
        .get("_scope")
        .and_then(Value::as_array)
        .is_some_and(|scopes| {
            scopes.iter().any(|s| {
                s.get("name").and_then(Value::as_str) == Some(device)
                    && s.get("vdom").and_then(Value::as_str) == Some(vdom)
            })
        })
}

fn scope_of(data: &Value) -> (String, String) {
    let scope = data.pointer("/_scope/0");
    let field = |key: &str| {
        scope
            .and_then(|s| s.get(key))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("name"), field("vdom"))
}

/// Recording fake of the management API.
pub struct FakeApi {
    inventory: Mutex<Inventory>,
    calls: Mutex<Vec<ApiRequest>>,
    failures: Mutex<Vec<(Verb, String)>>,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeApi {
    /// A server with only the built-in ADOMs.
    pub fn new() -> Self {
        let inventory = Inventory {
            adoms: vec![
                json!({"name": "root", "desc": "", "create_time": 0, "os_ver": 7, "mr": 2}),
                json!({"name": "rootp", "desc": "", "create_time": 0, "os_ver": 7, "mr": 2}),
            ],
            ..Inventory::default()
        };
        Self {
            inventory: Mutex::new(inventory),
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Add a user-created ADOM.
    pub async fn seed_adom(&self, name: &str, desc: &str, major: u32, minor: u32) {
        self.inventory.lock().await.adoms.push(json!({
            "name": name,
            "desc": desc,
            "os_ver": major,
            "mr": minor,
            "create_time": 1_700_000_000,
        }));
    }

    /// Register a device.
    pub async fn seed_device(&self, adom: &str, name: &str, serial: &str) {
        self.inventory
            .lock()
            .await
            .devices
            .entry(adom.to_string())
            .or_default()
            .push(json!({"name": name, "sn": serial}));
    }

    /// Add a metavariable.
    pub async fn seed_variable(&self, adom: &str, name: &str, value: &str) {
        self.inventory
            .lock()
            .await
            .variables
            .entry(adom.to_string())
            .or_default()
            .push(json!({"name": name, "value": value, "dynamic_mapping": []}));
    }

    /// Add an override to an existing metavariable.
    pub async fn seed_mapping(&self, adom: &str, name: &str, device: &str, vdom: &str, value: &str) {
        let mut inventory = self.inventory.lock().await;
        if let Some(Value::Array(mappings)) = inventory
            .variable_mut(adom, name)
            .and_then(|v| v.get_mut("dynamic_mapping"))
        {
            mappings.push(json!({"_scope": [{"name": device, "vdom": vdom}], "value": value}));
        }
    }

    /// Make every `verb` call on `url` fail.
    pub async fn fail_on(&self, verb: Verb, url: &str) {
        self.failures.lock().await.push((verb, url.to_string()));
    }

    /// Every call so far.
    pub async fn calls(&self) -> Vec<ApiRequest> {
        self.calls.lock().await.clone()
    }

    /// Every call that could change state.
    pub async fn writes(&self) -> Vec<ApiRequest> {
        self.calls
            .lock()
            .await
            .iter()
            .filter(|r| r.verb.is_write())
            .cloned()
            .collect()
    }

    /// Forget recorded calls.
    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    /// Names of user-created ADOMs.
    pub async fn adom_names(&self) -> Vec<String> {
        self.inventory
            .lock()
            .await
            .adoms
            .iter()
            .filter(|a| a.get("create_time").and_then(Value::as_u64) != Some(0))
            .filter_map(|a| a.get("name").and_then(Value::as_str))
            .map(str::to_string)
            .collect()
    }

    /// Names of devices registered in `adom`.
    pub async fn device_names(&self, adom: &str) -> Vec<String> {
        self.inventory
            .lock()
            .await
            .devices
            .get(adom)
            .map(|devices| {
                devices
                    .iter()
                    .filter_map(|d| d.get("name").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// ADOM-level value of a metavariable.
    pub async fn variable_value(&self, adom: &str, name: &str) -> Option<String> {
        self.inventory
            .lock()
            .await
            .variable_mut(adom, name)
            .and_then(|v| v.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Override of a metavariable for `device`/`vdom`.
    pub async fn mapping_value(&self, adom: &str, name: &str, device: &str, vdom: &str) -> Option<String> {
        self.inventory
            .lock()
            .await
            .variable_mut(adom, name)
            .and_then(|v| v.get("dynamic_mapping"))
            .and_then(Value::as_array)
            .and_then(|mappings| mappings.iter().find(|m| same_scope(m, device, vdom)))
            .and_then(|m| m.get("value"))
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    async fn handle(&self, request: ApiRequest) -> Result<Value> {
        self.calls.lock().await.push(request.clone());

        let url = request.url.as_str();
        let injected = self
            .failures
            .lock()
            .await
            .iter()
            .any(|(verb, failing)| *verb == request.verb && failing == url);
        if injected {
            return Err(Error::api(INJECTED, url, "injected failure"));
        }

        let mut inventory = self.inventory.lock().await;
        let data = request.payload;
        let missing = |what: &str| Error::api(NOT_FOUND, url, format!("{what} does not exist"));
        let duplicate = |what: &str| Error::api(DUPLICATE, url, format!("{what} already exists"));

        match (request.verb, route(url)) {
            (Verb::Get, Route::Adoms) => Ok(Value::Array(inventory.adoms.clone())),
            (Verb::Get, Route::Devices(adom)) => {
                if !inventory.has_adom(adom) {
                    return Err(missing("adom"));
                }
                Ok(Value::Array(inventory.devices.get(adom).cloned().unwrap_or_default()))
            }
            (Verb::Get, Route::Variables(adom)) => {
                if !inventory.has_adom(adom) {
                    return Err(missing("adom"));
                }
                Ok(Value::Array(inventory.variables.get(adom).cloned().unwrap_or_default()))
            }
            (Verb::Add, Route::Adoms) => {
                let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
                if inventory.has_adom(name) {
                    return Err(duplicate("adom"));
                }
                let mut record = data.as_object().cloned().unwrap_or_default();
                record.insert("create_time".to_string(), json!(1_700_000_000));
                inventory.adoms.push(Value::Object(record));
                Ok(Value::Null)
            }
            (Verb::Update, Route::Adom(adom)) => {
                let record = inventory
                    .adoms
                    .iter_mut()
                    .find(|a| a.get("name").and_then(Value::as_str) == Some(adom))
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| missing("adom"))?;
                for (key, value) in data.as_object().cloned().unwrap_or_default() {
                    record.insert(key, value);
                }
                Ok(Value::Null)
            }
            (Verb::Exec, Route::AddDevice) => {
                let adom = data.get("adom").and_then(Value::as_str).unwrap_or_default();
                let name = data.pointer("/device/name").and_then(Value::as_str).unwrap_or_default();
                let serial = data.pointer("/device/sn").and_then(Value::as_str).unwrap_or_default();
                if !inventory.has_adom(adom) {
                    return Err(missing("adom"));
                }
                if inventory.serial_in_use(serial) {
                    return Err(Error::api(SERIAL_IN_USE, url, "Serial number already in use"));
                }
                let devices = inventory.devices.entry(adom.to_string()).or_default();
                if devices.iter().any(|d| d.get("name").and_then(Value::as_str) == Some(name)) {
                    return Err(duplicate("device"));
                }
                devices.push(json!({"name": name, "sn": serial}));
                Ok(json!({"taskid": 1}))
            }
            (Verb::Add, Route::Variables(adom)) => {
                if !inventory.has_adom(adom) {
                    return Err(missing("adom"));
                }
                let name = data.get("name").and_then(Value::as_str).unwrap_or_default();
                if inventory.variable_mut(adom, name).is_some() {
                    return Err(duplicate("variable"));
                }
                let mut record = data.as_object().cloned().unwrap_or_default();
                record.insert("dynamic_mapping".to_string(), json!([]));
                inventory
                    .variables
                    .entry(adom.to_string())
                    .or_default()
                    .push(Value::Object(record));
                Ok(Value::Null)
            }
            (Verb::Update, Route::Variable(adom, name)) => {
                let record = inventory
                    .variable_mut(adom, name)
                    .and_then(Value::as_object_mut)
                    .ok_or_else(|| missing("variable"))?;
                record.insert("value".to_string(), data.get("value").cloned().unwrap_or_default());
                Ok(Value::Null)
            }
            (verb @ (Verb::Add | Verb::Update), Route::Mappings(adom, name)) => {
                let (device, vdom) = scope_of(&data);
                let mappings = inventory
                    .variable_mut(adom, name)
                    .and_then(|v| v.get_mut("dynamic_mapping"))
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| missing("variable"))?;
                let existing = mappings.iter_mut().find(|m| same_scope(m, &device, &vdom));
                match (verb, existing) {
                    (Verb::Add, Some(_)) => Err(duplicate("mapping")),
                    (Verb::Update, None) => Err(missing("mapping")),
                    (_, Some(mapping)) => {
                        *mapping = data;
                        Ok(Value::Null)
                    }
                    (_, None) => {
                        mappings.push(data);
                        Ok(Value::Null)
                    }
                }
            }
            _ => Err(Error::api(NOT_FOUND, url, "unsupported request")),
        }
    }
}

#[async_trait]
impl RemoteApi for FakeApi {
    async fn get(&self, url: &str, params: Value) -> Result<Value> {
        self.handle(ApiRequest::new(Verb::Get, url, params)).await
    }

    async fn add(&self, url: &str, data: Value) -> Result<Value> {
        self.handle(ApiRequest::add(url, data)).await
    }

    async fn update(&self, url: &str, data: Value) -> Result<Value> {
        self.handle(ApiRequest::update(url, data)).await
    }

    async fn exec(&self, url: &str, data: Value) -> Result<Value> {
        self.handle(ApiRequest::exec(url, data)).await
    }
}
