//! The academic entities served by the API.

use crate::config::types::{ColumnDefault, EntityDef, FieldDef, Operation};

/// All entity descriptors. Order is not significant; tables are created in
/// foreign-key dependency order by the resolver.
pub fn catalog() -> Vec<EntityDef> {
    vec![
        student(),
        professor(),
        faculty(),
        major(),
        course(),
        prerequisite(),
        section(),
        enrollment(),
        payment(),
        grade(),
    ]
}

fn active() -> FieldDef {
    FieldDef::boolean("activo").default(ColumnDefault::Bool(true))
}

pub fn student() -> EntityDef {
    EntityDef::new(
        "Student",
        "estudiante",
        "students",
        vec![
            FieldDef::text("nombre", Some(50)),
            FieldDef::text("apellido", Some(50)),
            FieldDef::text("dni", Some(20)).unique(),
            FieldDef::text("email", Some(100)).unique(),
            FieldDef::text("telefono", Some(20)).nullable(),
            FieldDef::date("fecha_nacimiento"),
            FieldDef::text("direccion", Some(200)).nullable(),
            active(),
        ],
    )
}

pub fn professor() -> EntityDef {
    EntityDef::new(
        "Professor",
        "profesor",
        "professors",
        vec![
            FieldDef::text("nombre", Some(50)),
            FieldDef::text("apellido", Some(50)),
            FieldDef::text("dni", Some(20)).unique(),
            FieldDef::text("email", Some(100)).unique(),
            FieldDef::text("telefono", Some(20)).nullable(),
            FieldDef::text("especialidad", Some(100)).nullable(),
            FieldDef::text("titulo_academico", Some(100)).nullable(),
            active(),
        ],
    )
}

pub fn faculty() -> EntityDef {
    EntityDef::new(
        "Faculty",
        "facultad",
        "faculties",
        vec![
            FieldDef::text("nombre", Some(100)).unique(),
            FieldDef::text("descripcion", None).nullable(),
            FieldDef::text("ubicacion", Some(100)).nullable(),
            FieldDef::text("decano", Some(100)).nullable(),
            active(),
        ],
    )
}

pub fn major() -> EntityDef {
    EntityDef::new(
        "Major",
        "carrera",
        "majors",
        vec![
            FieldDef::foreign_key("facultad_id", "facultad"),
            FieldDef::text("nombre", Some(100)).unique(),
            FieldDef::text("descripcion", None).nullable(),
            FieldDef::integer("duracion_semestres"),
            FieldDef::text("titulo_otorgado", Some(100)).nullable(),
            active(),
        ],
    )
}

pub fn course() -> EntityDef {
    EntityDef::new(
        "Course",
        "curso",
        "courses",
        vec![
            FieldDef::foreign_key("carrera_id", "carrera"),
            FieldDef::text("codigo", Some(20)).unique(),
            FieldDef::text("nombre", Some(100)),
            FieldDef::text("descripcion", None).nullable(),
            FieldDef::integer("creditos").exclusive_minimum(0.0),
            FieldDef::integer("nivel_semestre").exclusive_minimum(0.0),
            active(),
        ],
    )
}

/// A (course, required course) pair. Pairs are created and deleted, never edited.
pub fn prerequisite() -> EntityDef {
    EntityDef::new(
        "Prerequisite",
        "prerrequisito",
        "prerequisites",
        vec![
            FieldDef::foreign_key("curso_id", "curso").immutable(),
            FieldDef::foreign_key("curso_req_id", "curso").immutable(),
        ],
    )
    .without(Operation::Update)
}

pub fn section() -> EntityDef {
    EntityDef::new(
        "Section",
        "seccion",
        "sections",
        vec![
            FieldDef::foreign_key("curso_id", "curso"),
            FieldDef::foreign_key("profesor_id", "profesor"),
            FieldDef::text("codigo", Some(20)),
            FieldDef::integer("capacidad_maxima").exclusive_minimum(0.0),
            FieldDef::text("aula", Some(50)).nullable(),
            FieldDef::text("horario", Some(50)).nullable(),
            FieldDef::text("dias", Some(50)).nullable(),
            FieldDef::text("periodo_academico", Some(20)),
            FieldDef::date("fecha_inicio").nullable(),
            FieldDef::date("fecha_fin").nullable(),
            active(),
        ],
    )
}

pub fn enrollment() -> EntityDef {
    EntityDef::new(
        "Enrollment",
        "matricula",
        "enrollments",
        vec![
            FieldDef::foreign_key("estudiante_id", "estudiante").immutable(),
            FieldDef::foreign_key("seccion_id", "seccion").immutable(),
            FieldDef::date("fecha_matricula")
                .default(ColumnDefault::CurrentDate)
                .immutable(),
            FieldDef::text("estado", Some(20)).default(ColumnDefault::Text("PENDIENTE")),
            FieldDef::decimal("costo", 2).minimum(0.0),
            FieldDef::text("metodo_pago", Some(50)).nullable(),
        ],
    )
}

pub fn payment() -> EntityDef {
    EntityDef::new(
        "Payment",
        "pago",
        "payments",
        vec![
            FieldDef::foreign_key("matricula_id", "matricula").immutable(),
            FieldDef::date("fecha_pago")
                .default(ColumnDefault::CurrentDate)
                .immutable(),
            FieldDef::decimal("monto", 2).exclusive_minimum(0.0).immutable(),
            FieldDef::text("metodo_pago", Some(50)).immutable(),
            FieldDef::text("referencia", Some(100)).nullable(),
            FieldDef::text("estado", Some(20)).default(ColumnDefault::Text("PROCESADO")),
        ],
    )
}

/// One grade per enrollment, score in [0, 20] with two decimals.
pub fn grade() -> EntityDef {
    EntityDef::new(
        "Grade",
        "calificacion",
        "grades",
        vec![
            FieldDef::foreign_key("matricula_id", "matricula")
                .unique()
                .immutable(),
            FieldDef::decimal("nota", 2).nullable().minimum(0.0).maximum(20.0),
            FieldDef::text("observacion", None).nullable(),
        ],
    )
}
