//! The catalog of model types: tags, type hierarchy and field schemas.
//!
//! A base type is bound to a record tag. A refinement narrows a base type
//! for a particular context (a control id, or the parent it appears under)
//! and adds its own fields after the base ones.

use super::header::Version;
use super::record::TagId;
use super::registry::{ExtensionKey, ExtensionRule};
use super::control::chid;
use super::schema::{
    f, Condition, Count, FieldKind, FieldSpec, Prefix, COLORREF, HWPUNIT, HWPUNIT16, SHWPUNIT,
};
use serde::Serialize;

macro_rules! model_types {
    ($($(#[$meta:meta])* $variant:ident,)*) => {
        /// Every type a record can resolve to.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum ModelType {
            $($(#[$meta])* $variant,)*
        }

        impl ModelType {
            /// All types, in registration order.
            pub const ALL: &'static [ModelType] = &[$(ModelType::$variant,)*];

            pub fn name(self) -> &'static str {
                match self {
                    $(ModelType::$variant => stringify!($variant),)*
                }
            }
        }
    };
}

model_types! {
    // DocInfo
    DocumentProperties,
    IdMappings,
    BinData,
    FaceName,
    BorderFill,
    CharShape,
    TabDef,
    Numbering,
    Bullet,
    ParaShape,
    Style,
    DocData,
    DistributeDocData,
    CompatibleDocument,
    LayoutCompatibility,
    TrackChange,
    MemoShape,
    ForbiddenChar,
    TrackChangeContent,
    TrackChangeAuthor,

    // BodyText
    /// PARA_HEADER
    Paragraph,
    ParaText,
    ParaCharShape,
    ParaLineSeg,
    ParaRangeTag,
    /// CTRL_HEADER
    Control,
    ListHeader,
    PageDef,
    FootnoteShape,
    PageBorderFill,
    ShapeComponent,
    /// TABLE
    TableBody,
    ShapeLine,
    ShapeRectangle,
    ShapeEllipse,
    ShapeArc,
    ShapePolygon,
    ShapeCurve,
    ShapeOle,
    ShapePicture,
    ShapeContainer,
    ControlData,
    EqEdit,
    ShapeTextArt,
    FormObject,
    MemoList,
    ChartData,
    VideoData,
    ShapeUnknown,

    // Control refinements
    /// Abstract: controls with object placement properties.
    CommonControl,
    TableControl,
    GShapeObjectControl,
    EqEditControl,
    SectionDef,
    ColumnsDef,
    Header,
    Footer,
    Footnote,
    Endnote,
    AutoNumbering,
    NewNumbering,
    PageHide,
    PageOddEven,
    PageNumberPosition,
    IndexMarker,
    BookmarkControl,
    TcpsControl,
    Dutmal,
    HiddenComment,
    /// Abstract: field controls (`%xxx`).
    Field,
    FieldUnknown,
    FieldDate,
    FieldDocDate,
    FieldPath,
    FieldBookmark,
    FieldMailMerge,
    FieldCrossRef,
    FieldFormula,
    FieldClickHere,
    FieldSummary,
    FieldUserInfo,
    FieldHyperLink,
    FieldRevisionSign,
    FieldMemo,
    FieldTableOfContents,

    // ListHeader refinements
    TableCaption,
    TableCell,
    HeaderParagraphList,
    FooterParagraphList,
    TextboxParagraphList,

    /// Record with an unregistered tag.
    Unknown,
}

impl ModelType {
    /// Record tag bound to a base type.
    pub fn tag(self) -> Option<TagId> {
        use ModelType::*;
        let tag = match self {
            DocumentProperties => TagId::DocumentProperties,
            IdMappings => TagId::IdMappings,
            BinData => TagId::BinData,
            FaceName => TagId::FaceName,
            BorderFill => TagId::BorderFill,
            CharShape => TagId::CharShape,
            TabDef => TagId::TabDef,
            Numbering => TagId::Numbering,
            Bullet => TagId::Bullet,
            ParaShape => TagId::ParaShape,
            Style => TagId::Style,
            DocData => TagId::DocData,
            DistributeDocData => TagId::DistributeDocData,
            CompatibleDocument => TagId::CompatibleDocument,
            LayoutCompatibility => TagId::LayoutCompatibility,
            TrackChange => TagId::TrackChange,
            MemoShape => TagId::MemoShape,
            ForbiddenChar => TagId::ForbiddenChar,
            TrackChangeContent => TagId::TrackChangeContent,
            TrackChangeAuthor => TagId::TrackChangeAuthor,
            Paragraph => TagId::ParaHeader,
            ParaText => TagId::ParaText,
            ParaCharShape => TagId::ParaCharShape,
            ParaLineSeg => TagId::ParaLineSeg,
            ParaRangeTag => TagId::ParaRangeTag,
            Control => TagId::CtrlHeader,
            ListHeader => TagId::ListHeader,
            PageDef => TagId::PageDef,
            FootnoteShape => TagId::FootnoteShape,
            PageBorderFill => TagId::PageBorderFill,
            ShapeComponent => TagId::ShapeComponent,
            TableBody => TagId::Table,
            ShapeLine => TagId::ShapeComponentLine,
            ShapeRectangle => TagId::ShapeComponentRectangle,
            ShapeEllipse => TagId::ShapeComponentEllipse,
            ShapeArc => TagId::ShapeComponentArc,
            ShapePolygon => TagId::ShapeComponentPolygon,
            ShapeCurve => TagId::ShapeComponentCurve,
            ShapeOle => TagId::ShapeComponentOle,
            ShapePicture => TagId::ShapeComponentPicture,
            ShapeContainer => TagId::ShapeComponentContainer,
            ControlData => TagId::CtrlData,
            EqEdit => TagId::EqEdit,
            ShapeTextArt => TagId::ShapeComponentTextArt,
            FormObject => TagId::FormObject,
            MemoList => TagId::MemoList,
            ChartData => TagId::ChartData,
            VideoData => TagId::VideoData,
            ShapeUnknown => TagId::ShapeComponentUnknown,
            _ => return None,
        };
        Some(tag)
    }

    /// Direct supertype of a refinement.
    pub fn supertype(self) -> Option<ModelType> {
        use ModelType::*;
        match self {
            CommonControl | SectionDef | ColumnsDef | Header | Footer | Footnote | Endnote
            | AutoNumbering | NewNumbering | PageHide | PageOddEven | PageNumberPosition
            | IndexMarker | BookmarkControl | TcpsControl | Dutmal | HiddenComment | Field => {
                Some(Control)
            }
            TableControl | GShapeObjectControl | EqEditControl => Some(CommonControl),
            FieldUnknown | FieldDate | FieldDocDate | FieldPath | FieldBookmark
            | FieldMailMerge | FieldCrossRef | FieldFormula | FieldClickHere | FieldSummary
            | FieldUserInfo | FieldHyperLink | FieldRevisionSign | FieldMemo
            | FieldTableOfContents => Some(Field),
            TableCaption | TableCell | HeaderParagraphList | FooterParagraphList
            | TextboxParagraphList => Some(ListHeader),
            _ => None,
        }
    }

    /// Returns true if `self` is `other` or refines it.
    pub fn is_a(self, other: ModelType) -> bool {
        let mut current = Some(self);
        while let Some(ty) = current {
            if ty == other {
                return true;
            }
            current = ty.supertype();
        }
        false
    }

    /// The tag-bound type at the root of the hierarchy.
    pub fn base(self) -> ModelType {
        let mut ty = self;
        while let Some(parent) = ty.supertype() {
            ty = parent;
        }
        ty
    }

    /// Types from just below the base down to `self`, outermost first.
    pub fn refinement_chain(self) -> Vec<ModelType> {
        let mut chain = Vec::new();
        let mut ty = self;
        while let Some(parent) = ty.supertype() {
            chain.push(ty);
            ty = parent;
        }
        chain.reverse();
        chain
    }

    /// How a base type picks its refinement.
    pub fn extension_rule(self) -> Option<ExtensionRule> {
        match self {
            ModelType::Control => Some(ExtensionRule::ByChid("chid")),
            ModelType::ListHeader => Some(ExtensionRule::ByParent),
            _ => None,
        }
    }

    /// Key under which a concrete refinement is registered.
    pub fn extension_key(self) -> Option<ExtensionKey> {
        use ModelType::*;
        let by_parent = |parent, seen_table_body| {
            Some(ExtensionKey::Parent {
                parent,
                seen_table_body,
            })
        };
        let id = match self {
            TableControl => chid::TBL,
            GShapeObjectControl => chid::GSO,
            EqEditControl => chid::EQED,
            SectionDef => chid::SECD,
            ColumnsDef => chid::COLD,
            Header => chid::HEADER,
            Footer => chid::FOOTER,
            Footnote => chid::FN,
            Endnote => chid::EN,
            AutoNumbering => chid::ATNO,
            NewNumbering => chid::NWNO,
            PageHide => chid::PGHD,
            PageOddEven => chid::PGCT,
            PageNumberPosition => chid::PGNP,
            IndexMarker => chid::IDXM,
            BookmarkControl => chid::BOKM,
            TcpsControl => chid::TCPS,
            Dutmal => chid::TDUT,
            HiddenComment => chid::TCMT,
            FieldUnknown => chid::FIELD_UNKNOWN,
            FieldDate => chid::FIELD_DATE,
            FieldDocDate => chid::FIELD_DOCDATE,
            FieldPath => chid::FIELD_PATH,
            FieldBookmark => chid::FIELD_BOOKMARK,
            FieldMailMerge => chid::FIELD_MAILMERGE,
            FieldCrossRef => chid::FIELD_CROSSREF,
            FieldFormula => chid::FIELD_FORMULA,
            FieldClickHere => chid::FIELD_CLICKHERE,
            FieldSummary => chid::FIELD_SUMMARY,
            FieldUserInfo => chid::FIELD_USERINFO,
            FieldHyperLink => chid::FIELD_HYPERLINK,
            FieldRevisionSign => chid::FIELD_REVISION_SIGN,
            FieldMemo => chid::FIELD_MEMO,
            FieldTableOfContents => chid::FIELD_TOC,
            TableCaption => return by_parent(TableControl, false),
            TableCell => return by_parent(TableControl, true),
            HeaderParagraphList => return by_parent(Header, false),
            FooterParagraphList => return by_parent(Footer, false),
            TextboxParagraphList => return by_parent(ShapeComponent, false),
            _ => return None,
        };
        Some(ExtensionKey::Chid(id))
    }

    /// The type's own fields, excluding those of its supertypes.
    pub fn fields(self) -> &'static [FieldSpec] {
        use ModelType::*;
        match self {
            DocumentProperties => DOCUMENT_PROPERTIES,
            IdMappings => ID_MAPPINGS,
            BinData => BIN_DATA,
            FaceName => FACE_NAME,
            BorderFill => BORDER_FILL,
            CharShape => CHAR_SHAPE,
            TabDef => TAB_DEF,
            Numbering => NUMBERING,
            Bullet => BULLET,
            ParaShape => PARA_SHAPE,
            Style => STYLE,
            DistributeDocData => DISTRIBUTE_DOC_DATA,
            CompatibleDocument => COMPATIBLE_DOCUMENT,
            LayoutCompatibility => LAYOUT_COMPATIBILITY,
            Paragraph => PARAGRAPH,
            ParaText => PARA_TEXT,
            ParaCharShape => PARA_CHAR_SHAPE,
            ParaLineSeg => PARA_LINE_SEG,
            ParaRangeTag => PARA_RANGE_TAG,
            Control => CONTROL,
            ListHeader => LIST_HEADER,
            PageDef => PAGE_DEF,
            FootnoteShape => FOOTNOTE_SHAPE,
            PageBorderFill => PAGE_BORDER_FILL,
            ShapeComponent => SHAPE_COMPONENT,
            TableBody => TABLE_BODY,
            ShapeLine => SHAPE_LINE,
            ShapeRectangle => SHAPE_RECTANGLE,
            ShapeEllipse => SHAPE_ELLIPSE,
            ShapeArc => SHAPE_ARC,
            ShapePolygon => SHAPE_POLYGON,
            ShapeCurve => SHAPE_CURVE,
            ShapeOle => SHAPE_OLE,
            ShapePicture => SHAPE_PICTURE,
            ShapeContainer => SHAPE_CONTAINER,
            EqEdit => EQ_EDIT,
            CommonControl => COMMON_CONTROL,
            SectionDef => SECTION_DEF,
            ColumnsDef => COLUMNS_DEF,
            Header | Footer | PageHide | PageOddEven => FLAGS_ONLY,
            AutoNumbering => AUTO_NUMBERING,
            NewNumbering => NEW_NUMBERING,
            PageNumberPosition => PAGE_NUMBER_POSITION,
            IndexMarker => INDEX_MARKER,
            Dutmal => DUTMAL,
            Field => FIELD,
            TableCaption => TABLE_CAPTION,
            TableCell => TABLE_CELL,
            HeaderParagraphList | FooterParagraphList => HEADER_FOOTER_LIST,
            TextboxParagraphList => TEXTBOX_LIST,
            _ => &[],
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

const V5_0_1_0: Version = Version::new(5, 0, 1, 0);
const V5_0_1_7: Version = Version::new(5, 0, 1, 7);
const V5_0_2_1: Version = Version::new(5, 0, 2, 1);
const V5_0_2_5: Version = Version::new(5, 0, 2, 5);
const V5_0_3_0: Version = Version::new(5, 0, 3, 0);
const V5_0_3_2: Version = Version::new(5, 0, 3, 2);

macro_rules! per_language {
    ($kind:expr) => {
        &[
            f("ko", $kind),
            f("en", $kind),
            f("cn", $kind),
            f("jp", $kind),
            f("other", $kind),
            f("symbol", $kind),
            f("user", $kind),
        ]
    };
}

const LANG_U16: &[FieldSpec] = per_language!(FieldKind::U16);
const LANG_U8: &[FieldSpec] = per_language!(FieldKind::U8);
const LANG_I8: &[FieldSpec] = per_language!(FieldKind::I8);

const POINT: &[FieldSpec] = &[f("x", SHWPUNIT), f("y", SHWPUNIT)];
const MARGIN16: &[FieldSpec] = &[
    f("left", HWPUNIT16),
    f("right", HWPUNIT16),
    f("top", HWPUNIT16),
    f("bottom", HWPUNIT16),
];
const PADDING: &[FieldSpec] = &[
    f("left", FieldKind::U16),
    f("right", FieldKind::U16),
    f("top", FieldKind::U16),
    f("bottom", FieldKind::U16),
];
const BORDER_LINE: &[FieldSpec] = &[
    f("stroke_type", FieldKind::U8),
    f("width", FieldKind::U8),
    f("color", COLORREF),
];

// DocInfo

const DOCUMENT_PROPERTIES: &[FieldSpec] = &[
    f("section_count", FieldKind::U16),
    f("page_startnum", FieldKind::U16),
    f("footnote_startnum", FieldKind::U16),
    f("endnote_startnum", FieldKind::U16),
    f("picture_startnum", FieldKind::U16),
    f("table_startnum", FieldKind::U16),
    f("math_startnum", FieldKind::U16),
    f("list_id", FieldKind::U32),
    f("paragraph_id", FieldKind::U32),
    f("character_unit_loc_in_paragraph", FieldKind::U32),
];

/// Per-language face name counts, in FaceName record order.
pub const FACE_NAME_GROUPS: [&str; 7] = [
    "ko_fonts",
    "en_fonts",
    "cn_fonts",
    "jp_fonts",
    "other_fonts",
    "symbol_fonts",
    "user_fonts",
];

const ID_MAPPINGS: &[FieldSpec] = &[
    f("bindata", FieldKind::U32),
    f("ko_fonts", FieldKind::U32),
    f("en_fonts", FieldKind::U32),
    f("cn_fonts", FieldKind::U32),
    f("jp_fonts", FieldKind::U32),
    f("other_fonts", FieldKind::U32),
    f("symbol_fonts", FieldKind::U32),
    f("user_fonts", FieldKind::U32),
    f("borderfills", FieldKind::U32),
    f("charshapes", FieldKind::U32),
    f("tabdefs", FieldKind::U32),
    f("numberings", FieldKind::U32),
    f("bullets", FieldKind::U32),
    f("parashapes", FieldKind::U32),
    f("styles", FieldKind::U32),
    f("memoshapes", FieldKind::U32).since(V5_0_2_1),
    f("trackchanges", FieldKind::U32).since(V5_0_3_2),
    f("trackchange_authors", FieldKind::U32).since(V5_0_3_2),
];

/// BinData storage kinds, in the low nibble of `flags`.
pub mod bindata_kind {
    pub const LINK: u32 = 0;
    pub const EMBEDDING: u32 = 1;
    pub const STORAGE: u32 = 2;
}

const BIN_DATA: &[FieldSpec] = &[
    f("flags", FieldKind::U16),
    f("abspath", FieldKind::Bstr).when(Condition::Masked {
        field: "flags",
        mask: 0xF,
        value: bindata_kind::LINK,
    }),
    f("relpath", FieldKind::Bstr).when(Condition::Masked {
        field: "flags",
        mask: 0xF,
        value: bindata_kind::LINK,
    }),
    f("storage_id", FieldKind::U16).when(Condition::MaskedNot {
        field: "flags",
        mask: 0xF,
        value: bindata_kind::LINK,
    }),
    f("ext", FieldKind::Bstr).when(Condition::Masked {
        field: "flags",
        mask: 0xF,
        value: bindata_kind::EMBEDDING,
    }),
];

const PANOSE1: &[FieldSpec] = &[
    f("family_type", FieldKind::U8),
    f("serif_style", FieldKind::U8),
    f("weight", FieldKind::U8),
    f("proportion", FieldKind::U8),
    f("contrast", FieldKind::U8),
    f("stroke_variation", FieldKind::U8),
    f("arm_style", FieldKind::U8),
    f("letterform", FieldKind::U8),
    f("midline", FieldKind::U8),
    f("x_height", FieldKind::U8),
];

const FACE_NAME: &[FieldSpec] = &[
    f("flags", FieldKind::U8),
    f("name", FieldKind::Bstr),
    f("alternate_kind", FieldKind::U8).when(Condition::FlagSet {
        field: "flags",
        mask: 0x80,
    }),
    f("alternate_name", FieldKind::Bstr).when(Condition::FlagSet {
        field: "flags",
        mask: 0x80,
    }),
    f("panose1", FieldKind::Struct(PANOSE1)).when(Condition::FlagSet {
        field: "flags",
        mask: 0x40,
    }),
    f("default_font_name", FieldKind::Bstr).when(Condition::FlagSet {
        field: "flags",
        mask: 0x20,
    }),
];

const BORDER_FILL: &[FieldSpec] = &[
    f("borderflags", FieldKind::U16),
    f("left", FieldKind::Struct(BORDER_LINE)),
    f("right", FieldKind::Struct(BORDER_LINE)),
    f("top", FieldKind::Struct(BORDER_LINE)),
    f("bottom", FieldKind::Struct(BORDER_LINE)),
    f("diagonal", FieldKind::Struct(BORDER_LINE)),
    f("fillflags", FieldKind::U32),
];

const SHADOW_SPACE: &[FieldSpec] = &[f("x", FieldKind::I8), f("y", FieldKind::I8)];

const CHAR_SHAPE: &[FieldSpec] = &[
    f("font_face", FieldKind::Struct(LANG_U16)),
    f("letter_width_expansion", FieldKind::Struct(LANG_U8)),
    f("letter_spacing", FieldKind::Struct(LANG_I8)),
    f("relative_size", FieldKind::Struct(LANG_U8)),
    f("position", FieldKind::Struct(LANG_I8)),
    f("basesize", FieldKind::I32),
    f("charshapeflags", FieldKind::U32),
    f("shadow_space", FieldKind::Struct(SHADOW_SPACE)),
    f("text_color", COLORREF),
    f("underline_color", COLORREF),
    f("shade_color", COLORREF),
    f("shadow_color", COLORREF),
    f("borderfill_id", FieldKind::U16).since(V5_0_2_1),
    f("strikeout_color", COLORREF).since(V5_0_3_0),
];

const TAB: &[FieldSpec] = &[
    f("pos", HWPUNIT),
    f("kind", FieldKind::U8),
    f("fill_type", FieldKind::U8),
    f("unknown", FieldKind::U16),
];

const TAB_DEF: &[FieldSpec] = &[
    f("attr", FieldKind::U32),
    f(
        "tabs",
        FieldKind::Array(&FieldKind::Struct(TAB), Count::Prefixed(Prefix::I32)),
    ),
];

const PARA_HEAD_INFO: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("width_correction", HWPUNIT16),
    f("text_distance", HWPUNIT16),
    f("charshape_id", FieldKind::U32),
];

const NUMBERING_LEVEL: &[FieldSpec] = &[
    f("head", FieldKind::Struct(PARA_HEAD_INFO)),
    f("format", FieldKind::Bstr),
];

const NUMBERING: &[FieldSpec] = &[
    f(
        "levels",
        FieldKind::Array(&FieldKind::Struct(NUMBERING_LEVEL), Count::Fixed(7)),
    ),
    f("starting_number", FieldKind::U16),
    f(
        "level_starting_numbers",
        FieldKind::Array(&FieldKind::U32, Count::Fixed(7)),
    )
    .since(V5_0_2_5),
];

const BULLET: &[FieldSpec] = &[
    f("head", FieldKind::Struct(PARA_HEAD_INFO)),
    f("bullet_char", FieldKind::U16),
];

const PARA_SHAPE: &[FieldSpec] = &[
    f("parashapeflags", FieldKind::U32),
    f("doubled_margin_left", FieldKind::I32),
    f("doubled_margin_right", FieldKind::I32),
    f("indent", FieldKind::I32),
    f("doubled_margin_top", FieldKind::I32),
    f("doubled_margin_bottom", FieldKind::I32),
    f("linespacing_before2007", FieldKind::I32),
    f("tabdef_id", FieldKind::U16),
    f("numbering_bullet_id", FieldKind::U16),
    f("borderfill_id", FieldKind::U16),
    f("border_left", FieldKind::I16),
    f("border_right", FieldKind::I16),
    f("border_top", FieldKind::I16),
    f("border_bottom", FieldKind::I16),
    f("flags2", FieldKind::U32).since(V5_0_1_7),
    f("flags3", FieldKind::U32).since(V5_0_2_5),
    f("linespacing", FieldKind::U32).since(V5_0_2_5),
];

const STYLE: &[FieldSpec] = &[
    f("local_name", FieldKind::Bstr),
    f("name", FieldKind::Bstr),
    f("flags", FieldKind::U8),
    f("next_style_id", FieldKind::U8),
    f("lang_id", FieldKind::I16),
    f("parashape_id", FieldKind::U16),
    f("charshape_id", FieldKind::U16),
];

/// Size of the scrambled key material in a distribution document.
pub const DISTRIBUTE_DOC_DATA_SIZE: usize = 256;

const DISTRIBUTE_DOC_DATA: &[FieldSpec] = &[f(
    "data",
    FieldKind::Bytes(DISTRIBUTE_DOC_DATA_SIZE),
)];

const COMPATIBLE_DOCUMENT: &[FieldSpec] = &[f("target", FieldKind::U32)];

const LAYOUT_COMPATIBILITY: &[FieldSpec] = &[
    f("char", FieldKind::U32),
    f("paragraph", FieldKind::U32),
    f("section", FieldKind::U32),
    f("object", FieldKind::U32),
    f("field", FieldKind::U32),
];

// BodyText

const PARAGRAPH: &[FieldSpec] = &[
    f("chars", FieldKind::U32),
    f("controlmask", FieldKind::U32),
    f("parashape_id", FieldKind::U16),
    f("style_id", FieldKind::U8),
    f("split", FieldKind::U8),
    f("charshapes", FieldKind::U16),
    f("rangetags", FieldKind::U16),
    f("linesegs", FieldKind::U16),
    f("instance_id", FieldKind::U32),
    f("change_tracking_merge", FieldKind::U16).since(V5_0_3_2),
];

const PARA_TEXT: &[FieldSpec] = &[f("chunks", FieldKind::ParaText)];

const CHARSHAPE_POS: &[FieldSpec] = &[
    f("pos", FieldKind::U32),
    f("charshape_id", FieldKind::U32),
];

const PARA_CHAR_SHAPE: &[FieldSpec] = &[f(
    "charshapes",
    FieldKind::Array(
        &FieldKind::Struct(CHARSHAPE_POS),
        Count::ParentField("charshapes"),
    ),
)];

/// Layout of one line in a ParaLineSeg record.
pub const LINE_SEG: &[FieldSpec] = &[
    f("chpos", FieldKind::U32),
    f("y", SHWPUNIT),
    f("height", SHWPUNIT),
    f("height_text", SHWPUNIT),
    f("height_baseline", SHWPUNIT),
    f("space_below", SHWPUNIT),
    f("x", SHWPUNIT),
    f("width", SHWPUNIT),
    f("lineseg_flags", FieldKind::U32),
];

const PARA_LINE_SEG: &[FieldSpec] = &[f(
    "linesegs",
    FieldKind::Array(&FieldKind::Struct(LINE_SEG), Count::ParentField("linesegs")),
)];

const RANGE_TAG: &[FieldSpec] = &[
    f("start", FieldKind::U32),
    f("end", FieldKind::U32),
    f("tag", FieldKind::U32),
];

const PARA_RANGE_TAG: &[FieldSpec] = &[f(
    "range_tags",
    FieldKind::Array(&FieldKind::Struct(RANGE_TAG), Count::ParentField("rangetags")),
)];

const CONTROL: &[FieldSpec] = &[f("chid", FieldKind::Chid)];

const COMMON_CONTROL: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("y", SHWPUNIT),
    f("x", SHWPUNIT),
    f("width", HWPUNIT),
    f("height", HWPUNIT),
    f("z_order", FieldKind::I16),
    f("unknown1", FieldKind::I16),
    f("margin", FieldKind::Struct(MARGIN16)),
    f("instance_id", FieldKind::U32),
];

const SECTION_DEF: &[FieldSpec] = &[
    f("attr", FieldKind::U32),
    f("columnspacing", HWPUNIT16),
    f("grid_vertical", HWPUNIT16),
    f("grid_horizontal", HWPUNIT16),
    f("default_tab_stops", HWPUNIT),
    f("numbering_shape_id", FieldKind::U16),
    f("starting_pagenum", FieldKind::U16),
    f("starting_picturenum", FieldKind::U16),
    f("starting_tablenum", FieldKind::U16),
    f("starting_equationnum", FieldKind::U16),
];

const COLUMNS_DEF: &[FieldSpec] = &[f("flags", FieldKind::U16), f("spacing", HWPUNIT16)];

const FLAGS_ONLY: &[FieldSpec] = &[f("flags", FieldKind::U32)];

const AUTO_NUMBERING: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("number", FieldKind::U16),
    f("usersymbol", FieldKind::U16),
    f("prefix", FieldKind::U16),
    f("suffix", FieldKind::U16),
];

const NEW_NUMBERING: &[FieldSpec] = &[f("flags", FieldKind::U32), f("number", FieldKind::U16)];

const PAGE_NUMBER_POSITION: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("usersymbol", FieldKind::U16),
    f("prefix", FieldKind::U16),
    f("suffix", FieldKind::U16),
    f("dash", FieldKind::U16),
];

const INDEX_MARKER: &[FieldSpec] = &[
    f("keyword1", FieldKind::Bstr),
    f("keyword2", FieldKind::Bstr),
];

const DUTMAL: &[FieldSpec] = &[
    f("maintext", FieldKind::Bstr),
    f("subtext", FieldKind::Bstr),
    f("position", FieldKind::U32),
    f("fsizeratio", FieldKind::U32),
    f("option", FieldKind::U32),
    f("stylenumber", FieldKind::U32),
    f("alignment", FieldKind::U32),
];

const FIELD: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("extra_attr", FieldKind::U8),
    f("command", FieldKind::Bstr),
    f("id", FieldKind::U32),
];

const LIST_HEADER: &[FieldSpec] = &[
    f("paragraphs", FieldKind::U16),
    f("unknown1", FieldKind::U16),
    f("listflags", FieldKind::U32),
];

const TABLE_CAPTION: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("width", HWPUNIT),
    f("separation", HWPUNIT16),
    f("max_width", HWPUNIT),
];

const TABLE_CELL: &[FieldSpec] = &[
    f("col", FieldKind::U16),
    f("row", FieldKind::U16),
    f("colspan", FieldKind::U16),
    f("rowspan", FieldKind::U16),
    f("width", HWPUNIT),
    f("height", HWPUNIT),
    f("padding", FieldKind::Struct(PADDING)),
    f("borderfill_id", FieldKind::U16),
    f("unknown_width", HWPUNIT),
];

const HEADER_FOOTER_LIST: &[FieldSpec] = &[
    f("text_width", HWPUNIT),
    f("text_height", HWPUNIT),
    f("text_ref", FieldKind::U8),
    f("numbering_ref", FieldKind::U8),
];

const TEXTBOX_LIST: &[FieldSpec] = &[
    f("padding", FieldKind::Struct(MARGIN16)),
    f("maxwidth", HWPUNIT),
];

const PAGE_DEF: &[FieldSpec] = &[
    f("width", HWPUNIT),
    f("height", HWPUNIT),
    f("left_offset", HWPUNIT),
    f("right_offset", HWPUNIT),
    f("top_offset", HWPUNIT),
    f("bottom_offset", HWPUNIT),
    f("header_offset", HWPUNIT),
    f("footer_offset", HWPUNIT),
    f("bookbinding_offset", HWPUNIT),
    f("attr", FieldKind::U32),
];

const FOOTNOTE_SHAPE: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("usersymbol", FieldKind::U16),
    f("prefix", FieldKind::U16),
    f("suffix", FieldKind::U16),
    f("starting_number", FieldKind::U16),
    f("splitter_length", HWPUNIT16),
    f("splitter_margin_top", HWPUNIT16),
    f("splitter_margin_bottom", HWPUNIT16),
    f("notes_spacing", HWPUNIT16),
    f("splitter_stroke_type", FieldKind::U8),
    f("splitter_width", FieldKind::U8),
    f("splitter_color", COLORREF),
];

const PAGE_BORDER_FILL: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("margin", FieldKind::Struct(MARGIN16)),
    f("borderfill_id", FieldKind::U16),
];

const SHAPE_COMPONENT: &[FieldSpec] = &[
    f("chid0", FieldKind::Chid).when(Condition::ParentIs(ModelType::GShapeObjectControl)),
    f("chid", FieldKind::Chid),
    f("x_in_group", SHWPUNIT),
    f("y_in_group", SHWPUNIT),
    f("level_in_group", FieldKind::U16),
    f("local_version", FieldKind::U16),
    f("initial_width", HWPUNIT),
    f("initial_height", HWPUNIT),
    f("width", HWPUNIT),
    f("height", HWPUNIT),
    f("flags", FieldKind::U32),
    f("angle", FieldKind::U16),
    f("rotation_center", FieldKind::Struct(POINT)),
];

const ZONE_INFO: &[FieldSpec] = &[
    f("starting_column", FieldKind::U16),
    f("starting_row", FieldKind::U16),
    f("end_column", FieldKind::U16),
    f("end_row", FieldKind::U16),
    f("borderfill_id", FieldKind::U16),
];

const TABLE_BODY: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("rows", FieldKind::U16),
    f("cols", FieldKind::U16),
    f("cellspacing", HWPUNIT16),
    f("padding", FieldKind::Struct(PADDING)),
    f(
        "rowcols",
        FieldKind::Array(&FieldKind::U16, Count::Field("rows")),
    ),
    f("borderfill_id", FieldKind::U16),
    f(
        "valid_zones",
        FieldKind::Array(&FieldKind::Struct(ZONE_INFO), Count::Prefixed(Prefix::U16)),
    )
    .since(V5_0_1_0),
];

const SHAPE_LINE: &[FieldSpec] = &[
    f("p0", FieldKind::Struct(POINT)),
    f("p1", FieldKind::Struct(POINT)),
    f("attr", FieldKind::U16),
];

const SHAPE_RECTANGLE: &[FieldSpec] = &[
    f("round", FieldKind::U8),
    f(
        "coords",
        FieldKind::Array(&FieldKind::Struct(POINT), Count::Fixed(4)),
    ),
];

const SHAPE_ELLIPSE: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("center", FieldKind::Struct(POINT)),
    f("axis1", FieldKind::Struct(POINT)),
    f("axis2", FieldKind::Struct(POINT)),
    f("start1", FieldKind::Struct(POINT)),
    f("end1", FieldKind::Struct(POINT)),
    f("start2", FieldKind::Struct(POINT)),
    f("end2", FieldKind::Struct(POINT)),
];

const SHAPE_ARC: &[FieldSpec] = &[
    f("center", FieldKind::Struct(POINT)),
    f("axis1", FieldKind::Struct(POINT)),
    f("axis2", FieldKind::Struct(POINT)),
];

const SHAPE_POLYGON: &[FieldSpec] = &[f(
    "points",
    FieldKind::Array(&FieldKind::Struct(POINT), Count::Prefixed(Prefix::I16)),
)];

const SHAPE_CURVE: &[FieldSpec] = &[f(
    "points",
    FieldKind::Array(&FieldKind::Struct(POINT), Count::Prefixed(Prefix::I16)),
)];

const SHAPE_OLE: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("extent", FieldKind::Struct(POINT)),
    f("storage_id", FieldKind::U16),
    f("border_color", COLORREF),
    f("border_width", FieldKind::I32),
    f("border_flags", FieldKind::U32),
];

const CROP: &[FieldSpec] = &[
    f("left", FieldKind::I32),
    f("top", FieldKind::I32),
    f("right", FieldKind::I32),
    f("bottom", FieldKind::I32),
];

const PICTURE_INFO: &[FieldSpec] = &[
    f("brightness", FieldKind::I8),
    f("contrast", FieldKind::I8),
    f("effect", FieldKind::U8),
    f("bindata_id", FieldKind::U16),
];

const SHAPE_PICTURE: &[FieldSpec] = &[
    f("border_color", COLORREF),
    f("border_width", FieldKind::I32),
    f("border_flags", FieldKind::U32),
    f(
        "rect",
        FieldKind::Array(&FieldKind::Struct(POINT), Count::Fixed(4)),
    ),
    f("crop", FieldKind::Struct(CROP)),
    f("padding", FieldKind::Struct(MARGIN16)),
    f("picture", FieldKind::Struct(PICTURE_INFO)),
];

const SHAPE_CONTAINER: &[FieldSpec] = &[f(
    "controls",
    FieldKind::Array(&FieldKind::Chid, Count::Prefixed(Prefix::U16)),
)];

const EQ_EDIT: &[FieldSpec] = &[
    f("flags", FieldKind::U32),
    f("script", FieldKind::Bstr),
    f("font_size", HWPUNIT),
    f("color", COLORREF),
    f("baseline", FieldKind::I16),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy() {
        assert!(ModelType::TableControl.is_a(ModelType::CommonControl));
        assert!(ModelType::TableControl.is_a(ModelType::Control));
        assert!(ModelType::FieldHyperLink.is_a(ModelType::Field));
        assert!(!ModelType::TableCell.is_a(ModelType::Control));
        assert_eq!(ModelType::TableCell.base(), ModelType::ListHeader);
        assert_eq!(
            ModelType::EqEditControl.refinement_chain(),
            vec![ModelType::CommonControl, ModelType::EqEditControl]
        );
        assert!(ModelType::Paragraph.refinement_chain().is_empty());
    }

    #[test]
    fn test_every_refinement_reaches_a_tagged_base() {
        for &ty in ModelType::ALL {
            if ty == ModelType::Unknown {
                assert!(ty.tag().is_none());
                continue;
            }
            let base = ty.base();
            assert!(base.tag().is_some(), "{} has no tagged base", ty);
            if ty.extension_key().is_some() {
                assert!(base.extension_rule().is_some(), "{} cannot be selected", ty);
            }
        }
    }

    #[test]
    fn test_tags_are_unique() {
        let mut seen = std::collections::HashSet::new();
        for ty in ModelType::ALL.iter().filter_map(|t| t.tag()) {
            assert!(seen.insert(ty), "{:?} bound twice", ty);
        }
    }

    #[test]
    fn test_names() {
        assert_eq!(ModelType::TableCaption.name(), "TableCaption");
        assert_eq!(ModelType::Paragraph.to_string(), "Paragraph");
    }
}
