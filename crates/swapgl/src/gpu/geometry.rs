use std::rc::Rc;

use crate::error::Result;
use crate::gpu::context::GraphicsContext;
use crate::gpu::program::ShaderProgram;

/// Unit-square corners of the single proxy triangle; the fixed vertex shader
/// stretches it over the whole target.
const FULL_SCREEN_TRIANGLE: [f32; 6] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0];

/// Vertex buffer feeding the `position` attribute of every hosted program.
pub struct GeometryBuffer<C: GraphicsContext> {
    context: Rc<C>,
    buffer: C::Buffer,
    components: i32,
    vertex_count: i32,
}

impl<C: GraphicsContext> GeometryBuffer<C> {
    pub fn full_screen_triangle(context: Rc<C>) -> Result<Self> {
        let buffer = context.create_vertex_buffer(&FULL_SCREEN_TRIANGLE)?;
        Ok(Self {
            context,
            buffer,
            components: 2,
            vertex_count: 3,
        })
    }

    /// Points `program`'s position attribute at this buffer.
    pub fn bind(&self, program: &ShaderProgram<C>) -> &Self {
        self.context
            .bind_vertex_attribute(self.buffer, program.position_location(), self.components);
        self
    }

    /// Issues one draw covering the whole current viewport.
    pub fn draw(&self) {
        self.context.draw_triangles(0, self.vertex_count);
    }

    pub fn vertex_count(&self) -> i32 {
        self.vertex_count
    }
}

impl<C: GraphicsContext> Drop for GeometryBuffer<C> {
    fn drop(&mut self) {
        self.context.delete_buffer(self.buffer);
    }
}
