//! Interface stubs in generated form
//!
//! Types from the fax server's outbound routing configuration and from the
//! InitShutdown interface. Each type lays out its fields the way the stub
//! generator does: explicit structure alignment, pointer bodies left to the
//! deferred queue, and NDR64 trailing padding.

use midl_ndr::{
    FullPtr, NdrDecode, NdrEncode, NdrError, NdrOperation, NdrReader, NdrUnion, NdrUuid,
    NdrWString, NdrWriter, PreparePayload, PtrKey, Referent, Result, UniquePtr,
};

/// FAX_ENUM_GROUP_STATUS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum GroupStatus {
    #[default]
    AllDevValid = 0,
    EmptyGroup = 1,
    AllDevNotValid = 2,
    SomeDevNotValid = 3,
}

impl TryFrom<u16> for GroupStatus {
    type Error = NdrError;

    fn try_from(value: u16) -> Result<Self> {
        match value {
            0 => Ok(Self::AllDevValid),
            1 => Ok(Self::EmptyGroup),
            2 => Ok(Self::AllDevNotValid),
            3 => Ok(Self::SomeDevNotValid),
            other => Err(NdrError::InvalidEnumValue(other.into())),
        }
    }
}

impl NdrEncode for GroupStatus {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_enum(*self as u16)
    }

    fn ndr_align() -> usize {
        2
    }
}

impl NdrDecode for GroupStatus {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Self::try_from(r.read_enum()?)
    }

    fn ndr_align() -> usize {
        2
    }
}

/// RPC_FAX_OUTBOUND_ROUTING_GROUPW
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OutboundRoutingGroup {
    pub structure_size: u32,
    /// `[string, unique] LPWSTR lpwstrGroupName`
    pub group_name: UniquePtr<NdrWString>,
    pub devices_length: u32,
    /// `[size_is(dwNumDevices), unique] LPDWORD lpdwDevices`
    pub devices: Referent<Vec<u32>>,
    pub status: GroupStatus,
}

impl NdrEncode for OutboundRoutingGroup {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let align = w.context().pointer_size();
        w.align(align)?;
        w.write_u32(self.structure_size)?;
        self.group_name.ndr_encode(w)?;
        w.write_u32(self.devices_length)?;
        let size = u64::from(self.devices_length);
        match self.devices.get() {
            Some(devices) => w.write_pointer(Some(PtrKey::of(devices)), move |w| {
                w.write_conformant_array(devices.as_slice(), size)
            })?,
            None => w.write_null_pointer()?,
        }
        self.status.ndr_encode(w)?;
        w.trailing_gap(align)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for OutboundRoutingGroup {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let align = r.context().pointer_size();
        r.align(align)?;
        let structure_size = r.read_u32()?;
        let group_name = UniquePtr::ndr_decode(r)?;
        let devices_length = r.read_u32()?;
        let devices = r.read_pointer(|r| r.read_conformant_array::<u32>())?;
        let status = GroupStatus::ndr_decode(r)?;
        r.trailing_gap(align)?;
        Ok(Self {
            structure_size,
            group_name,
            devices_length,
            devices,
            status,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

impl PreparePayload for OutboundRoutingGroup {
    fn prepare_payload(&mut self) -> Result<()> {
        if let Some(devices) = self.devices.get() {
            if self.devices_length == 0 {
                self.devices_length =
                    u32::try_from(devices.len()).map_err(|_| NdrError::IntegerOverflow)?;
            }
        }
        Ok(())
    }

    fn after_prepare_payload(&mut self) -> Result<()> {
        if self.devices_length > 1000 {
            return Err(NdrError::InvalidPayload(format!(
                "group lists {} devices, at most 1000 allowed",
                self.devices_length
            )));
        }
        Ok(())
    }
}

/// FAX_RULE_DESTINATION, `[switch_type(BOOL)]`
#[derive(Debug, Clone, PartialEq)]
pub enum RuleDestination {
    /// `case 0`
    DeviceId(u32),
    /// `default`
    GroupName {
        switch: i32,
        name: UniquePtr<NdrWString>,
    },
}

impl NdrUnion for RuleDestination {
    type Switch = i32;

    fn switch_value(&self) -> i32 {
        match self {
            RuleDestination::DeviceId(_) => 0,
            RuleDestination::GroupName { switch, .. } => *switch,
        }
    }

    fn accepts(&self, switch: i32) -> bool {
        match self {
            RuleDestination::DeviceId(_) => switch == 0,
            RuleDestination::GroupName { .. } => switch != 0,
        }
    }

    fn arm_align() -> usize {
        8
    }

    fn encode_arm<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        match self {
            RuleDestination::DeviceId(id) => w.write_u32(*id),
            RuleDestination::GroupName { name, .. } => name.ndr_encode(w),
        }
    }

    fn decode_arm(switch: i32, r: &mut NdrReader) -> Result<Self> {
        match switch {
            0 => Ok(RuleDestination::DeviceId(r.read_u32()?)),
            switch => Ok(RuleDestination::GroupName {
                switch,
                name: UniquePtr::ndr_decode(r)?,
            }),
        }
    }
}

/// RPC_FAX_OUTBOUND_ROUTING_RULEW
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRoutingRule {
    pub structure_size: u32,
    pub area_code: u32,
    pub country_code: u32,
    pub use_group: bool,
    /// `[switch_is(bUseGroup)]`
    pub destination: RuleDestination,
}

impl NdrEncode for OutboundRoutingRule {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let align = w.context().pointer_size();
        w.align(align)?;
        w.write_u32(self.structure_size)?;
        w.write_u32(self.area_code)?;
        w.write_u32(self.country_code)?;
        w.write_u32(u32::from(self.use_group))?;
        w.write_union(&self.destination, i32::from(self.use_group))?;
        w.trailing_gap(align)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for OutboundRoutingRule {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let align = r.context().pointer_size();
        r.align(align)?;
        let structure_size = r.read_u32()?;
        let area_code = r.read_u32()?;
        let country_code = r.read_u32()?;
        let use_group = r.read_u32()? != 0;
        let destination: RuleDestination = r.read_union()?;
        let switch = i32::from(use_group);
        if !destination.accepts(switch) {
            return Err(NdrError::UnsupportedDiscriminant(destination.switch_value().into()));
        }
        r.trailing_gap(align)?;
        Ok(Self {
            structure_size,
            area_code,
            country_code,
            use_group,
            destination,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Fax job with an optional document name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobEntry {
    pub job_id: u32,
    pub document: UniquePtr<NdrWString>,
}

impl NdrEncode for JobEntry {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let align = w.context().pointer_size();
        w.align(align)?;
        w.write_u32(self.job_id)?;
        self.document.ndr_encode(w)?;
        w.trailing_gap(align)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for JobEntry {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let align = r.context().pointer_size();
        r.align(align)?;
        let job_id = r.read_u32()?;
        let document = UniquePtr::ndr_decode(r)?;
        r.trailing_gap(align)?;
        Ok(Self { job_id, document })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Two `[ptr]` references into the same job list
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobQueue {
    pub head: FullPtr<JobEntry>,
    pub current: FullPtr<JobEntry>,
}

impl NdrEncode for JobQueue {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let align = w.context().pointer_size();
        w.align(align)?;
        self.head.ndr_encode(w)?;
        self.current.ndr_encode(w)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for JobQueue {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let align = r.context().pointer_size();
        r.align(align)?;
        Ok(Self {
            head: FullPtr::ndr_decode(r)?,
            current: FullPtr::ndr_decode(r)?,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// Object reference: a GUID followed by flags
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ObjectRef {
    pub id: NdrUuid,
    pub flags: u32,
}

impl NdrEncode for ObjectRef {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.align(4)?;
        self.id.ndr_encode(w)?;
        w.write_u32(self.flags)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for ObjectRef {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        r.align(4)?;
        Ok(Self {
            id: NdrUuid::ndr_decode(r)?,
            flags: r.read_u32()?,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

/// REG_UNICODE_STRING
///
/// The buffer is counted, not NUL-terminated: `length` and `maximum_length`
/// are byte counts of UTF-16 data.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegUnicodeString {
    pub length: u16,
    pub maximum_length: u16,
    /// `[size_is(MaximumLength/2), length_is(Length/2)] WCHAR* Buffer`
    pub buffer: Referent<String>,
}

impl RegUnicodeString {
    pub fn new(text: &str) -> Self {
        Self {
            length: 0,
            maximum_length: 0,
            buffer: Referent::new(text.to_string()),
        }
    }

    pub fn text(&self) -> &str {
        self.buffer.get().map_or("", String::as_str)
    }
}

impl NdrEncode for RegUnicodeString {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        let align = w.context().pointer_size();
        w.align(align)?;
        w.write_u16(self.length)?;
        w.write_u16(self.maximum_length)?;
        let size = u64::from(self.maximum_length / 2);
        let length = u64::from(self.length / 2).min(size);
        match self.buffer.get() {
            Some(text) => w.write_pointer(Some(PtrKey::of(text)), move |w| {
                let units: Vec<u16> = text.encode_utf16().collect();
                let count = usize::try_from(length).map_err(|_| NdrError::IntegerOverflow)?;
                w.write_size(size)?;
                w.write_variance(0, length)?;
                for i in 0..count {
                    w.write_u16(units.get(i).copied().unwrap_or(0))?;
                }
                Ok(())
            })?,
            None => w.write_null_pointer()?,
        }
        w.trailing_gap(align)
    }

    fn ndr_align() -> usize {
        4
    }
}

impl NdrDecode for RegUnicodeString {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let align = r.context().pointer_size();
        r.align(align)?;
        let length = r.read_u16()?;
        let maximum_length = r.read_u16()?;
        let buffer = r.read_pointer(|r| {
            let size = r.read_size()?;
            let (_, actual) = r.read_bounded_variance(size)?;
            let units: Vec<u16> = r.read_elements(actual)?;
            Ok(String::from_utf16_lossy(&units))
        })?;
        r.trailing_gap(align)?;
        Ok(Self {
            length,
            maximum_length,
            buffer,
        })
    }

    fn ndr_align() -> usize {
        4
    }
}

impl PreparePayload for RegUnicodeString {
    fn prepare_payload(&mut self) -> Result<()> {
        if let Some(text) = self.buffer.get() {
            let bytes = text.encode_utf16().count() * 2;
            self.length = u16::try_from(bytes).map_err(|_| NdrError::IntegerOverflow)?;
            self.maximum_length = self.maximum_length.max(self.length);
        }
        Ok(())
    }
}

/// BaseInitiateShutdown request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseInitiateShutdownRequest {
    /// `[in, unique, string] PREGISTRY_SERVER_NAME ServerName`
    pub server_name: UniquePtr<NdrWString>,
    /// `[in, unique] PREG_UNICODE_STRING lpMessage`
    pub message: UniquePtr<RegUnicodeString>,
    pub timeout: u32,
    pub force_apps_closed: u8,
    pub reboot_after_shutdown: u8,
}

impl NdrEncode for BaseInitiateShutdownRequest {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        self.server_name.ndr_encode(w)?;
        w.flush_deferred()?;
        self.message.ndr_encode(w)?;
        w.flush_deferred()?;
        w.write_u32(self.timeout)?;
        w.write_u8(self.force_apps_closed)?;
        w.write_u8(self.reboot_after_shutdown)
    }
}

impl NdrDecode for BaseInitiateShutdownRequest {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let server_name = UniquePtr::ndr_decode(r)?;
        r.flush_deferred()?;
        let message = UniquePtr::ndr_decode(r)?;
        r.flush_deferred()?;
        Ok(Self {
            server_name,
            message,
            timeout: r.read_u32()?,
            force_apps_closed: r.read_u8()?,
            reboot_after_shutdown: r.read_u8()?,
        })
    }
}

impl PreparePayload for BaseInitiateShutdownRequest {
    fn prepare_payload(&mut self) -> Result<()> {
        if let Some(message) = self.message.as_mut() {
            midl_ndr::prepare(message)?;
        }
        Ok(())
    }
}

/// Win32 error code returned by every InitShutdown method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownResponse {
    pub return_value: u32,
}

impl NdrEncode for ShutdownResponse {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        w.write_u32(self.return_value)
    }
}

impl NdrDecode for ShutdownResponse {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        Ok(Self {
            return_value: r.read_u32()?,
        })
    }
}

impl PreparePayload for ShutdownResponse {}

/// BaseAbortShutdown request
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BaseAbortShutdownRequest {
    pub server_name: UniquePtr<NdrWString>,
}

impl NdrEncode for BaseAbortShutdownRequest {
    fn ndr_encode<'a>(&'a self, w: &mut NdrWriter<'a>) -> Result<()> {
        self.server_name.ndr_encode(w)?;
        w.flush_deferred()
    }
}

impl NdrDecode for BaseAbortShutdownRequest {
    fn ndr_decode(r: &mut NdrReader) -> Result<Self> {
        let server_name = UniquePtr::ndr_decode(r)?;
        r.flush_deferred()?;
        Ok(Self { server_name })
    }
}

impl PreparePayload for BaseAbortShutdownRequest {}

/// InitShutdown opnum 0
pub struct BaseInitiateShutdown;

impl NdrOperation for BaseInitiateShutdown {
    type Request = BaseInitiateShutdownRequest;
    type Response = ShutdownResponse;

    const OPNUM: u16 = 0;
    const NAME: &'static str = "BaseInitiateShutdown";
}

/// InitShutdown opnum 1
pub struct BaseAbortShutdown;

impl NdrOperation for BaseAbortShutdown {
    type Request = BaseAbortShutdownRequest;
    type Response = ShutdownResponse;

    const OPNUM: u16 = 1;
    const NAME: &'static str = "BaseAbortShutdown";
}
