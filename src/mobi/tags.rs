//! Known EXTH tag ids and how their values are interpreted.

/// How an EXTH value is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExthKind {
    /// Text in the MOBI header encoding.
    Text,
    /// Big-endian unsigned integer of 1 to 4 bytes.
    Integer,
    /// Integer where non-zero means true.
    Flag,
    /// Text holding a date in one of several loose formats.
    Date,
    /// Opaque bytes.
    Binary,
}

macro_rules! exth_tags {
    ($($variant:ident = $id:literal, $name:literal, $kind:ident, $repeat:literal;)*) => {
        /// EXTH tags with a known meaning.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ExthTag {
            $($variant,)*
        }

        impl ExthTag {
            /// Every known tag, in id order.
            pub const ALL: &'static [ExthTag] = &[$(ExthTag::$variant,)*];

            pub fn from_id(id: u32) -> Option<Self> {
                match id {
                    $($id => Some(ExthTag::$variant),)*
                    _ => None,
                }
            }

            pub fn id(self) -> u32 {
                match self {
                    $(ExthTag::$variant => $id,)*
                }
            }

            /// Snake-case field name.
            pub fn name(self) -> &'static str {
                match self {
                    $(ExthTag::$variant => $name,)*
                }
            }

            pub fn kind(self) -> ExthKind {
                match self {
                    $(ExthTag::$variant => ExthKind::$kind,)*
                }
            }

            /// Whether a file may carry several records with this tag, each
            /// contributing one value.
            pub fn is_repeatable(self) -> bool {
                match self {
                    $(ExthTag::$variant => $repeat,)*
                }
            }
        }
    };
}

exth_tags! {
    DrmServerId = 1, "drm_server_id", Text, false;
    DrmCommerceId = 2, "drm_commerce_id", Text, false;
    DrmEbookbaseBookId = 3, "drm_ebookbase_book_id", Text, false;
    Author = 100, "author", Text, true;
    Publisher = 101, "publisher", Text, false;
    Imprint = 102, "imprint", Text, false;
    Description = 103, "description", Text, false;
    Isbn = 104, "isbn", Text, true;
    Subject = 105, "subject", Text, true;
    PublishingDate = 106, "publishing_date", Date, false;
    Review = 107, "review", Text, false;
    Contributor = 108, "contributor", Text, true;
    Rights = 109, "rights", Text, false;
    SubjectCode = 110, "subject_code", Text, true;
    Type = 111, "type", Text, false;
    Source = 112, "source", Text, false;
    Asin = 113, "asin", Text, false;
    VersionNumber = 114, "version_number", Text, false;
    Sample = 115, "sample", Flag, false;
    StartReading = 116, "start_reading", Integer, false;
    Adult = 117, "adult", Text, false;
    RetailPrice = 118, "retail_price", Text, false;
    RetailCurrency = 119, "retail_currency", Text, false;
    Kf8Boundary = 121, "kf8_boundary", Integer, false;
    FixedLayout = 122, "fixed_layout", Text, false;
    BookType = 123, "book_type", Text, false;
    OrientationLock = 124, "orientation_lock", Text, false;
    ResourceCount = 125, "resource_count", Integer, false;
    OriginalResolution = 126, "original_resolution", Text, false;
    ZeroGutter = 127, "zero_gutter", Text, false;
    ZeroMargin = 128, "zero_margin", Text, false;
    MetadataResourceUri = 129, "metadata_resource_uri", Text, false;
    Unknown131 = 131, "unknown_131", Integer, false;
    Unknown132 = 132, "unknown_132", Integer, false;
    DictionaryShortName = 200, "dictionary_short_name", Text, false;
    CoverOffset = 201, "cover_offset", Integer, false;
    ThumbOffset = 202, "thumb_offset", Integer, false;
    HasFakeCover = 203, "has_fake_cover", Flag, false;
    CreatorSoftware = 204, "creator_software", Integer, false;
    CreatorMajorVersion = 205, "creator_major_version", Integer, false;
    CreatorMinorVersion = 206, "creator_minor_version", Integer, false;
    CreatorBuildNumber = 207, "creator_build_number", Integer, false;
    Watermark = 208, "watermark", Binary, false;
    TamperProofKeys = 209, "tamper_proof_keys", Binary, false;
    FontSignature = 300, "font_signature", Binary, false;
    ClippingLimit = 401, "clipping_limit", Integer, false;
    PublisherLimit = 402, "publisher_limit", Integer, false;
    Unknown403 = 403, "unknown_403", Binary, false;
    TextToSpeechDisabled = 404, "text_to_speech_disabled", Flag, false;
    RentBorrowFlag = 405, "rent_borrow_flag", Flag, false;
    RentExpirationDate = 406, "rent_expiration_date", Binary, false;
    Unknown407 = 407, "unknown_407", Binary, false;
    Unknown450 = 450, "unknown_450", Binary, false;
    Unknown451 = 451, "unknown_451", Binary, false;
    Unknown452 = 452, "unknown_452", Binary, false;
    Unknown453 = 453, "unknown_453", Binary, false;
    CdeContentType = 501, "cde_content_type", Text, false;
    LastUpdateTime = 502, "last_update_time", Date, false;
    UpdatedTitle = 503, "updated_title", Text, false;
    Asin504 = 504, "asin_504", Text, false;
    TitleFileAs = 508, "title_file_as", Text, false;
    CreatorFileAs = 517, "creator_file_as", Text, false;
    PublisherFileAs = 522, "publisher_file_as", Text, false;
    Language = 524, "language", Text, true;
    WritingMode = 525, "writing_mode", Text, false;
    PageProgressionDirection = 527, "page_progression_direction", Text, false;
    OverrideKindleFonts = 528, "override_kindle_fonts", Text, false;
    SourceDescription = 529, "source_description", Text, false;
    InputSourceType = 534, "input_source_type", Text, false;
    CreatorBuildTag = 535, "creator_build_tag", Text, false;
    Unknown536 = 536, "unknown_536", Binary, false;
    Resolution = 538, "resolution", Text, false;
    ContentHash = 542, "content_hash", Binary, false;
    InMemory = 547, "in_memory", Text, false;
}
